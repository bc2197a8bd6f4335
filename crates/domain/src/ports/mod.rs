use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod appointments;
pub mod catalog;
pub mod credits;
pub mod notify;
pub mod payment;
pub mod schedule;
pub mod subscriptions;
