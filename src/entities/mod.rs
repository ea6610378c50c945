pub mod order;
pub mod order_item;
pub mod product;
pub mod status_history;

pub use order::OrderStatus;
