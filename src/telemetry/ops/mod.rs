pub mod feed;
pub mod fetch;
pub mod init;
pub mod poll;
