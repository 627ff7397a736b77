// ==========================================
// FFE 规格项跟踪系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有成功写入都要留痕
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::ActionLogRepository;
