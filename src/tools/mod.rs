//! 四个工具的实现

pub mod copy;
pub mod extract;
pub mod rename;
pub mod verify;
