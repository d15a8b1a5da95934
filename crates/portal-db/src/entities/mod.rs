//! Database entities

pub mod patient;

pub use patient::Entity as Patient;

pub mod prelude {
    pub use super::patient::Entity as Patient;
}
