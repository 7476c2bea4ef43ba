//! Database entities

pub mod user;

pub use user::Entity as User;

pub mod prelude {
    pub use super::user::Entity as User;
}
