// ==========================================
// FFE 规格项跟踪系统 - 汇总引擎
// ==========================================
// 职责: 按过滤条件计算分币种采购/零售小计、平均折扣率、流程计数
// 红线: 只读投影,不修改任何规格项
// 红线: 不同币种永不相加
// ==========================================

use crate::config::WorkflowSettings;
use crate::domain::requirement::Supplier;
use crate::domain::spec_item::SpecItem;
use crate::domain::types::{PriceSide, SpecStatus};
use crate::engine::pricing::PricingEngine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

// ==========================================
// ItemFilter - 过滤条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub room_id: Option<String>,
    pub section_id: Option<String>,
    /// 为 None 时不过滤状态
    pub statuses: Option<Vec<SpecStatus>>,
    /// 有效币种（采购侧或零售侧任一匹配即可）
    pub currency: Option<String>,
    /// 名称/SKU/型号/文档编码/供应商名称 模糊匹配（忽略大小写）
    pub search: Option<String>,
    /// 是否包含已归档规格项
    pub include_archived: bool,
}

impl ItemFilter {
    pub fn for_room(room_id: &str) -> Self {
        Self {
            room_id: Some(room_id.to_string()),
            ..Default::default()
        }
    }

    /// 判断规格项是否满足过滤条件
    pub fn matches(
        &self,
        item: &SpecItem,
        suppliers: &HashMap<String, Supplier>,
        default_currency: &str,
    ) -> bool {
        if item.is_archived() && !self.include_archived {
            return false;
        }
        if let Some(room_id) = &self.room_id {
            if item.room_id.as_ref() != Some(room_id) {
                return false;
            }
        }
        if let Some(section_id) = &self.section_id {
            if item.section_id.as_ref() != Some(section_id) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&item.status) {
                return false;
            }
        }

        let supplier = item.supplier_id.as_ref().and_then(|id| suppliers.get(id));

        if let Some(currency) = &self.currency {
            let wanted = currency.trim().to_uppercase();
            let supplier_currency = supplier.map(|s| s.currency.as_str());
            let trade = PricingEngine::effective_currency(item, PriceSide::Trade, supplier_currency, default_currency);
            let rrp = PricingEngine::effective_currency(item, PriceSide::Rrp, supplier_currency, default_currency);
            if trade != wanted && rrp != wanted {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let haystacks = [
                    Some(item.name.as_str()),
                    item.sku.as_deref(),
                    item.model.as_deref(),
                    item.doc_code.as_deref(),
                    supplier.map(|s| s.name.as_str()),
                ];
                let hit = haystacks
                    .iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&needle));
                if !hit {
                    return false;
                }
            }
        }

        true
    }
}

// ==========================================
// FinancialSummary - 汇总结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// 币种 → 采购小计
    pub trade_subtotals: BTreeMap<String, Decimal>,
    /// 币种 → 零售小计
    pub rrp_subtotals: BTreeMap<String, Decimal>,
    /// 主币种
    pub primary_currency: String,
    /// 主币种平均折扣率 %（零售小计为 0 时为 None）
    pub average_discount_percent: Option<Decimal>,
    /// 尚未获得客户批准的数量（排除已完结状态）
    pub awaiting_approval_count: usize,
    /// 缺少 RRP 的数量（排除已完结状态）
    pub missing_rrp_count: usize,
    /// 参与汇总的规格项数量
    pub item_count: usize,
    /// 金额溢出而未计入小计的规格项
    pub overflowed_item_ids: Vec<String>,
}

impl FinancialSummary {
    pub fn trade_subtotal(&self, currency: &str) -> Decimal {
        self.trade_subtotals.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn rrp_subtotal(&self, currency: &str) -> Decimal {
        self.rrp_subtotals.get(currency).copied().unwrap_or(Decimal::ZERO)
    }
}

// ==========================================
// AggregationEngine
// ==========================================
pub struct AggregationEngine;

impl AggregationEngine {
    /// 计算汇总
    ///
    /// # 参数
    /// - items: 候选规格项
    /// - filter: 过滤条件
    /// - suppliers: 供应商目录（币种覆盖）
    /// - settings: 默认币种、主币种、已完结状态
    pub fn compute<'a, I>(
        items: I,
        filter: &ItemFilter,
        suppliers: &HashMap<String, Supplier>,
        settings: &WorkflowSettings,
    ) -> FinancialSummary
    where
        I: IntoIterator<Item = &'a SpecItem>,
    {
        let mut trade_subtotals: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut rrp_subtotals: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut awaiting_approval_count = 0;
        let mut missing_rrp_count = 0;
        let mut item_count = 0;
        let mut overflowed_item_ids = Vec::new();

        for item in items {
            if !filter.matches(item, suppliers, &settings.default_currency) {
                continue;
            }
            item_count += 1;

            let supplier_currency = item
                .supplier_id
                .as_ref()
                .and_then(|id| suppliers.get(id))
                .map(|s| s.currency.as_str());
            let trade_currency = PricingEngine::effective_currency(
                item,
                PriceSide::Trade,
                supplier_currency,
                &settings.default_currency,
            );
            let rrp_currency = PricingEngine::effective_currency(
                item,
                PriceSide::Rrp,
                supplier_currency,
                &settings.default_currency,
            );

            let trade_sum = PricingEngine::trade_line_total(item).and_then(|line| {
                trade_subtotals
                    .get(&trade_currency)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
                    .checked_add(line)
            });
            let rrp_sum = PricingEngine::line_total(item).and_then(|line| {
                rrp_subtotals
                    .get(&rrp_currency)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
                    .checked_add(line)
            });
            match (trade_sum, rrp_sum) {
                (Some(trade_sum), Some(rrp_sum)) => {
                    trade_subtotals.insert(trade_currency, trade_sum);
                    rrp_subtotals.insert(rrp_currency, rrp_sum);
                }
                _ => {
                    warn!(item_id = %item.id, "金额溢出,该规格项不计入小计");
                    overflowed_item_ids.push(item.id.clone());
                }
            }

            if settings.is_resolved(item.status) {
                continue;
            }
            if !item.client_approved {
                awaiting_approval_count += 1;
            }
            if item.rrp.is_none() {
                missing_rrp_count += 1;
            }
        }

        let primary_currency = settings.primary_currency.clone();
        let primary_rrp = rrp_subtotals.get(&primary_currency).copied().unwrap_or(Decimal::ZERO);
        let primary_trade = trade_subtotals.get(&primary_currency).copied().unwrap_or(Decimal::ZERO);
        let average_discount_percent = if primary_rrp.is_zero() {
            None
        } else {
            primary_rrp
                .checked_sub(primary_trade)
                .and_then(|margin| margin.checked_div(primary_rrp))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(PricingEngine::round2)
        };

        FinancialSummary {
            trade_subtotals,
            rrp_subtotals,
            primary_currency,
            average_discount_percent,
            awaiting_approval_count,
            missing_rrp_count,
            item_count,
            overflowed_item_ids,
        }
    }
}
