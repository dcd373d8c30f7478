pub mod scripted;
pub mod zeromq;
