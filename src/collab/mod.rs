pub mod datagen;
pub mod http;
pub mod mock;
pub mod oracle;
pub mod popup;
