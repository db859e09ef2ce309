pub mod account;
pub mod company;
pub mod menu;
pub mod role;

pub use account::{Account, AccountChanges, AccountCredentials, NewAccount};
pub use company::{Company, CreateCompany, UpdateCompany};
pub use menu::{CreateMenu, Menu, UpdateMenu};
pub use role::Role;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
