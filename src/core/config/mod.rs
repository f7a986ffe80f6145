pub mod data;
pub mod defaults;
pub mod io;
pub mod printing;
pub mod settings;
