// ==========================================
// FFE 规格项跟踪系统 - 领域类型定义
// ==========================================
// 职责: 规格项状态枚举、历史状态别名归一化
// 红线: 领域层只处理规范状态,别名仅在持久化边界归一化一次
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规格项状态 (Spec Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecStatus {
    Selected,          // 已选定
    RfqSent,           // 已发询价
    QuoteReceived,     // 已收到报价
    QuoteApproved,     // 报价已批准
    InvoicedToClient,  // 已向客户开票
    ClientPaid,        // 客户已付款
    Ordered,           // 已下单（需客户批准）
    Shipped,           // 已发货（需客户批准）
    Delivered,         // 已到货（需客户批准）
    Installed,         // 已安装（需客户批准）
    Closed,            // 已关闭（需客户批准）
    Draft,             // 草稿
    Hidden,            // 隐藏
    ClientToOrder,     // 客户自行下单
    ContractorToOrder, // 承包商下单
    Issue,             // 存在问题
    Archived,          // 已归档
}

/// 全部规范状态（按流程顺序）
pub const ALL_STATUSES: [SpecStatus; 17] = [
    SpecStatus::Selected,
    SpecStatus::RfqSent,
    SpecStatus::QuoteReceived,
    SpecStatus::QuoteApproved,
    SpecStatus::InvoicedToClient,
    SpecStatus::ClientPaid,
    SpecStatus::Ordered,
    SpecStatus::Shipped,
    SpecStatus::Delivered,
    SpecStatus::Installed,
    SpecStatus::Closed,
    SpecStatus::Draft,
    SpecStatus::Hidden,
    SpecStatus::ClientToOrder,
    SpecStatus::ContractorToOrder,
    SpecStatus::Issue,
    SpecStatus::Archived,
];

/// 需要客户批准才能进入的状态集合
pub const REQUIRES_APPROVAL: [SpecStatus; 5] = [
    SpecStatus::Ordered,
    SpecStatus::Shipped,
    SpecStatus::Delivered,
    SpecStatus::Installed,
    SpecStatus::Closed,
];

/// 历史状态别名表（旧字符串 → 规范状态）
///
/// 只用于读取/展示,不会回写数据库中的原始值
const LEGACY_ALIASES: &[(&str, SpecStatus)] = &[
    ("QUOTING", SpecStatus::RfqSent),
    ("RFQ", SpecStatus::RfqSent),
    ("QUOTED", SpecStatus::QuoteReceived),
    ("APPROVED", SpecStatus::QuoteApproved),
    ("INVOICED", SpecStatus::InvoicedToClient),
    ("PAID", SpecStatus::ClientPaid),
    ("RECEIVED", SpecStatus::Delivered),
    ("COMPLETE", SpecStatus::Closed),
    ("COMPLETED", SpecStatus::Closed),
    ("TO_ORDER", SpecStatus::ClientToOrder),
    ("PENDING", SpecStatus::Selected),
];

impl SpecStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SpecStatus::Selected => "SELECTED",
            SpecStatus::RfqSent => "RFQ_SENT",
            SpecStatus::QuoteReceived => "QUOTE_RECEIVED",
            SpecStatus::QuoteApproved => "QUOTE_APPROVED",
            SpecStatus::InvoicedToClient => "INVOICED_TO_CLIENT",
            SpecStatus::ClientPaid => "CLIENT_PAID",
            SpecStatus::Ordered => "ORDERED",
            SpecStatus::Shipped => "SHIPPED",
            SpecStatus::Delivered => "DELIVERED",
            SpecStatus::Installed => "INSTALLED",
            SpecStatus::Closed => "CLOSED",
            SpecStatus::Draft => "DRAFT",
            SpecStatus::Hidden => "HIDDEN",
            SpecStatus::ClientToOrder => "CLIENT_TO_ORDER",
            SpecStatus::ContractorToOrder => "CONTRACTOR_TO_ORDER",
            SpecStatus::Issue => "ISSUE",
            SpecStatus::Archived => "ARCHIVED",
        }
    }

    /// 严格解析规范状态字符串（不接受历史别名）
    pub fn from_canonical(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.to_db_str() == upper)
    }

    /// 归一化存储值: 规范值直接返回,历史别名映射为规范状态
    ///
    /// # 返回
    /// - Some(SpecStatus): 可识别的状态
    /// - None: 未知字符串
    pub fn normalize(raw: &str) -> Option<Self> {
        if let Some(status) = Self::from_canonical(raw) {
            return Some(status);
        }
        let upper = raw.trim().to_uppercase().replace([' ', '-'], "_");
        if let Some(status) = Self::from_canonical(&upper) {
            return Some(status);
        }
        LEGACY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, status)| *status)
    }

    /// 是否为需要客户批准的状态
    pub fn requires_approval(&self) -> bool {
        REQUIRES_APPROVAL.contains(self)
    }

    /// i18n 文案键
    pub fn label_key(&self) -> String {
        format!("status.{}", self.to_db_str().to_lowercase())
    }
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 价格方向 (Price Side)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSide {
    Trade, // 采购价
    Rrp,   // 建议零售价
}

impl fmt::Display for PriceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSide::Trade => write!(f, "TRADE"),
            PriceSide::Rrp => write!(f, "RRP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip_through_db_str() {
        for status in ALL_STATUSES {
            assert_eq!(SpecStatus::from_canonical(status.to_db_str()), Some(status));
        }
    }

    #[test]
    fn test_normalize_legacy_aliases() {
        assert_eq!(SpecStatus::normalize("RECEIVED"), Some(SpecStatus::Delivered));
        assert_eq!(SpecStatus::normalize("quoting"), Some(SpecStatus::RfqSent));
        assert_eq!(SpecStatus::normalize("to order"), Some(SpecStatus::ClientToOrder));
        assert_eq!(SpecStatus::normalize("ORDERED"), Some(SpecStatus::Ordered));
        assert_eq!(SpecStatus::normalize("NOT_A_STATUS"), None);
    }

    #[test]
    fn test_alias_is_not_canonical() {
        // 别名只在 normalize 中生效
        assert_eq!(SpecStatus::from_canonical("RECEIVED"), None);
    }

    #[test]
    fn test_requires_approval_subset() {
        let gated: Vec<_> = ALL_STATUSES
            .iter()
            .filter(|s| s.requires_approval())
            .collect();
        assert_eq!(gated.len(), 5);
        assert!(SpecStatus::Closed.requires_approval());
        assert!(!SpecStatus::ClientPaid.requires_approval());
        assert!(!SpecStatus::ContractorToOrder.requires_approval());
    }

    #[test]
    fn test_label_key() {
        assert_eq!(SpecStatus::RfqSent.label_key(), "status.rfq_sent");
    }
}
