pub mod destination;
pub mod host;
pub mod mac;
pub mod packet;
pub mod server;
pub mod service;
pub mod wol;
