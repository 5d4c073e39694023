mod collection;
mod db;
mod matcher;
mod projection;

pub use db::MemoryDriver;
