pub mod client;

pub use client::{CloseDayApi, HttpCloseDayApi};
