pub mod feed;
pub mod feed_item;
pub mod notification;
