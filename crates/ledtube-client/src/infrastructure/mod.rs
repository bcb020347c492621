//! Infrastructure layer for the client: the two sockets it needs.

pub mod network;
