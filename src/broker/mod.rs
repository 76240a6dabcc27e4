pub mod engine;
pub mod hooks;
pub mod message;
pub mod table;
pub mod topic;

pub use engine::{Broker, ConnectionState, PublishReport};
pub use message::{Ack, AckStatus, Envelope, Reply};
pub use table::{Subscriber, SubscriptionTable};
pub use topic::{ConnectionId, Params, SubscribeOutcome};
