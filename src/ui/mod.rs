//! Screens: domain list, domain detail, and the terminal shell driving them.

pub mod bootstrap;
pub mod detail;
pub mod domains;
pub mod navigation;
pub mod shell;

pub use bootstrap::{bootstrap, App};
pub use detail::{Alert, DetailOptions, DomainDetail, TokenDisplay};
pub use domains::{DomainCatalog, DomainList};
pub use navigation::{Navigator, Screen};
