//! API endpoint modules.

mod intermediate;
mod issue;
mod roles;
mod root;
mod settings;

pub use intermediate::IntermediateApi;
pub use issue::IssueApi;
pub use roles::RoleApi;
pub use root::RootApi;
pub use settings::SettingsApi;
