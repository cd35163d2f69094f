//! 静态配置
//!
//! 配置在启动时加载一次，然后以值的形式传入各个组件。
//! 不存在进程级全局配置。

mod structs;

pub use structs::*;
