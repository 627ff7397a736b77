// ==========================================
// FFE 规格项跟踪系统 - 规格项数据仓储
// ==========================================
// 对齐: spec_item 表 + spec_item_link 表
// 红线: Repository 不含业务逻辑
// 红线: 所有写入以 version 为条件,成功后 version + 1
// ==========================================

mod adapter;
mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::SpecItemRepository;
