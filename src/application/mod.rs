pub mod order_builder;
