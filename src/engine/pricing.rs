// ==========================================
// FFE 规格项跟踪系统 - 价格引擎
// ==========================================
// 职责: 有效币种判定、单跳价格派生、行合计
// 红线: 派生只由触发它的那一次编辑产生,不级联
// 红线: 直接修改 RRP 属于人工覆盖,不反推采购价/加价率
// ==========================================

use crate::domain::patch::SpecItemPatch;
use crate::domain::spec_item::SpecItem;
use crate::domain::types::PriceSide;
use crate::engine::error::{WorkflowError, WorkflowResult};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 单价上限（含派生结果）
pub const MAX_PRICE_UNITS: i64 = 1_000_000_000_000;
/// 加价率上限 %
pub const MAX_MARKUP_PERCENT: i64 = 100_000;

pub fn max_price() -> Decimal {
    Decimal::from(MAX_PRICE_UNITS)
}

// ==========================================
// PriceEdit - 价格字段编辑
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum PriceEdit {
    TradePrice(Option<Decimal>),
    Rrp(Option<Decimal>),
    MarkupPercent(Option<Decimal>),
    TradeDiscountPercent(Option<Decimal>),
    TradePriceCurrency(Option<String>),
    RrpCurrency(Option<String>),
}

impl PriceEdit {
    /// 字段名（用于日志与操作记录）
    pub fn field_name(&self) -> &'static str {
        match self {
            PriceEdit::TradePrice(_) => "tradePrice",
            PriceEdit::Rrp(_) => "rrp",
            PriceEdit::MarkupPercent(_) => "markupPercent",
            PriceEdit::TradeDiscountPercent(_) => "tradeDiscountPercent",
            PriceEdit::TradePriceCurrency(_) => "tradePriceCurrency",
            PriceEdit::RrpCurrency(_) => "rrpCurrency",
        }
    }
}

// ==========================================
// PricingEngine - 纯函数工具类
// ==========================================
pub struct PricingEngine;

impl PricingEngine {
    /// 保留两位小数（四舍五入,中点远离零）
    pub fn round2(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// 百分比系数: 1 + pct/100
    fn markup_factor(markup_percent: Decimal) -> Option<Decimal> {
        markup_percent
            .checked_div(Decimal::ONE_HUNDRED)
            .and_then(|ratio| Decimal::ONE.checked_add(ratio))
    }

    /// 规划一次价格编辑
    ///
    /// # 规则
    /// 1. 改采购价 → 只改采购价
    /// 2. 改加价率且采购价存在 → rrp = round2(trade × (1 + markup/100))
    /// 3. 改采购折扣且 rrp 存在 → trade = round2(rrp × (1 − discount/100))
    /// 4. 改 rrp → 只改 rrp
    /// 5. 改币种 → 只改对应币种（统一大写,空串视为清空）
    pub fn plan_edit(item: &SpecItem, edit: &PriceEdit) -> WorkflowResult<SpecItemPatch> {
        let mut patch = SpecItemPatch::default();
        match edit {
            PriceEdit::TradePrice(value) => {
                ensure_in_range("tradePrice", *value, max_price())?;
                patch.trade_price = Some(*value);
            }
            PriceEdit::Rrp(value) => {
                ensure_in_range("rrp", *value, max_price())?;
                patch.rrp = Some(*value);
            }
            PriceEdit::MarkupPercent(value) => {
                ensure_in_range("markupPercent", *value, Decimal::from(MAX_MARKUP_PERCENT))?;
                patch.markup_percent = Some(*value);
                if let (Some(markup), Some(trade)) = (value, item.trade_price) {
                    let rrp = Self::markup_factor(*markup)
                        .and_then(|factor| trade.checked_mul(factor))
                        .map(Self::round2);
                    patch.rrp = Some(Some(ensure_derived("rrp", rrp)?));
                }
            }
            PriceEdit::TradeDiscountPercent(value) => {
                ensure_in_range("tradeDiscountPercent", *value, Decimal::ONE_HUNDRED)?;
                patch.trade_discount_percent = Some(*value);
                if let (Some(discount), Some(rrp)) = (value, item.rrp) {
                    let trade = discount
                        .checked_div(Decimal::ONE_HUNDRED)
                        .and_then(|ratio| Decimal::ONE.checked_sub(ratio))
                        .and_then(|factor| rrp.checked_mul(factor))
                        .map(Self::round2);
                    patch.trade_price = Some(Some(ensure_derived("tradePrice", trade)?));
                }
            }
            PriceEdit::TradePriceCurrency(code) => {
                patch.trade_price_currency = Some(normalize_currency(code.as_deref()));
            }
            PriceEdit::RrpCurrency(code) => {
                patch.rrp_currency = Some(normalize_currency(code.as_deref()));
            }
        }
        Ok(patch)
    }

    /// 有效币种: 供应商币种 → 规格项存储币种 → 默认币种
    pub fn effective_currency(
        item: &SpecItem,
        side: PriceSide,
        supplier_currency: Option<&str>,
        default_currency: &str,
    ) -> String {
        let stored = match side {
            PriceSide::Trade => item.trade_price_currency.as_deref(),
            PriceSide::Rrp => item.rrp_currency.as_deref(),
        };
        supplier_currency
            .filter(|c| !c.trim().is_empty())
            .or(stored.filter(|c| !c.trim().is_empty()))
            .unwrap_or(default_currency)
            .trim()
            .to_uppercase()
    }

    /// 零售侧行合计
    ///
    /// (rrp ?? trade ?? 0) × quantity + Σ 子部件 price × (1 + markup/100) × qty
    ///
    /// 缺少 rrp 时按采购价计入（视作零加价）,而不是按 0 计；溢出时返回 None
    pub fn line_total(item: &SpecItem) -> Option<Decimal> {
        let unit = item.rrp.or(item.trade_price).unwrap_or(Decimal::ZERO);
        let factor = Self::markup_factor(item.markup_percent.unwrap_or(Decimal::ZERO))?;
        item.components.iter().try_fold(
            unit.checked_mul(item.quantity)?,
            |total, c| {
                let line = c.price.checked_mul(factor)?.checked_mul(c.quantity)?;
                total.checked_add(line)
            },
        )
    }

    /// 采购侧行合计
    ///
    /// (trade ?? rrp ?? 0) × quantity + Σ 子部件 price × qty；溢出时返回 None
    pub fn trade_line_total(item: &SpecItem) -> Option<Decimal> {
        let unit = item.trade_price.or(item.rrp).unwrap_or(Decimal::ZERO);
        item.components.iter().try_fold(
            unit.checked_mul(item.quantity)?,
            |total, c| total.checked_add(c.price.checked_mul(c.quantity)?),
        )
    }
}

fn ensure_in_range(field: &str, value: Option<Decimal>, max: Decimal) -> WorkflowResult<()> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(WorkflowError::InvalidPrice {
            field: field.to_string(),
            message: format!("不能为负数: {}", v),
        }),
        Some(v) if v > max => Err(WorkflowError::InvalidPrice {
            field: field.to_string(),
            message: format!("超出上限 {}: {}", max, v),
        }),
        _ => Ok(()),
    }
}

/// 派生值必须可计算且不超过单价上限
fn ensure_derived(field: &str, value: Option<Decimal>) -> WorkflowResult<Decimal> {
    match value {
        Some(v) if v <= max_price() => Ok(v),
        Some(v) => Err(WorkflowError::InvalidPrice {
            field: field.to_string(),
            message: format!("派生结果超出上限 {}: {}", max_price(), v),
        }),
        None => Err(WorkflowError::InvalidPrice {
            field: field.to_string(),
            message: "派生计算溢出".to_string(),
        }),
    }
}

fn normalize_currency(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec_item::PricedComponent;
    use rust_decimal_macros::dec;

    fn priced(trade: Option<Decimal>, rrp: Option<Decimal>) -> SpecItem {
        let mut item = SpecItem::new("P1", "Table");
        item.trade_price = trade;
        item.rrp = rrp;
        item
    }

    #[test]
    fn test_markup_derives_rrp_from_trade() {
        let item = priced(Some(dec!(100)), None);
        let patch = PricingEngine::plan_edit(&item, &PriceEdit::MarkupPercent(Some(dec!(50)))).unwrap();
        assert_eq!(patch.markup_percent, Some(Some(dec!(50))));
        assert_eq!(patch.rrp, Some(Some(dec!(150.00))));
        assert_eq!(patch.trade_price, None);
    }

    #[test]
    fn test_discount_derives_trade_from_rrp() {
        let item = priced(None, Some(dec!(200)));
        let patch =
            PricingEngine::plan_edit(&item, &PriceEdit::TradeDiscountPercent(Some(dec!(20)))).unwrap();
        assert_eq!(patch.trade_price, Some(Some(dec!(160.00))));
        assert_eq!(patch.rrp, None);
    }

    #[test]
    fn test_markup_without_trade_only_stores_markup() {
        let item = priced(None, Some(dec!(80)));
        let patch = PricingEngine::plan_edit(&item, &PriceEdit::MarkupPercent(Some(dec!(25)))).unwrap();
        assert_eq!(patch.changed_fields(), vec!["markup_percent"]);
    }

    #[test]
    fn test_trade_edit_never_touches_rrp() {
        let mut item = priced(Some(dec!(100)), Some(dec!(150)));
        item.markup_percent = Some(dec!(50));
        let patch = PricingEngine::plan_edit(&item, &PriceEdit::TradePrice(Some(dec!(120)))).unwrap();
        assert_eq!(patch.changed_fields(), vec!["trade_price"]);
    }

    #[test]
    fn test_rrp_edit_is_override() {
        let mut item = priced(Some(dec!(100)), Some(dec!(150)));
        item.markup_percent = Some(dec!(50));
        let patch = PricingEngine::plan_edit(&item, &PriceEdit::Rrp(Some(dec!(175)))).unwrap();
        assert_eq!(patch.changed_fields(), vec!["rrp"]);
    }

    #[test]
    fn test_round2_midpoint_away_from_zero() {
        assert_eq!(PricingEngine::round2(dec!(10.005)), dec!(10.01));
        assert_eq!(PricingEngine::round2(dec!(10.004)), dec!(10.00));
        let item = priced(Some(dec!(33.33)), None);
        let patch = PricingEngine::plan_edit(&item, &PriceEdit::MarkupPercent(Some(dec!(15)))).unwrap();
        // 33.33 × 1.15 = 38.3295
        assert_eq!(patch.rrp, Some(Some(dec!(38.33))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let item = priced(Some(dec!(10)), Some(dec!(20)));
        assert!(PricingEngine::plan_edit(&item, &PriceEdit::TradePrice(Some(dec!(-1)))).is_err());
        assert!(
            PricingEngine::plan_edit(&item, &PriceEdit::TradeDiscountPercent(Some(dec!(120)))).is_err()
        );
    }

    #[test]
    fn test_currency_edit_normalizes() {
        let item = priced(None, None);
        let patch =
            PricingEngine::plan_edit(&item, &PriceEdit::RrpCurrency(Some(" usd ".to_string()))).unwrap();
        assert_eq!(patch.rrp_currency, Some(Some("USD".to_string())));
        let patch =
            PricingEngine::plan_edit(&item, &PriceEdit::TradePriceCurrency(Some("".to_string()))).unwrap();
        assert_eq!(patch.trade_price_currency, Some(None));
    }

    #[test]
    fn test_effective_currency_precedence() {
        let mut item = priced(None, None);
        assert_eq!(PricingEngine::effective_currency(&item, PriceSide::Rrp, None, "CAD"), "CAD");
        item.rrp_currency = Some("USD".to_string());
        assert_eq!(PricingEngine::effective_currency(&item, PriceSide::Rrp, None, "CAD"), "USD");
        assert_eq!(PricingEngine::effective_currency(&item, PriceSide::Trade, None, "CAD"), "CAD");
        assert_eq!(
            PricingEngine::effective_currency(&item, PriceSide::Rrp, Some("eur"), "CAD"),
            "EUR"
        );
    }

    #[test]
    fn test_line_total_falls_back_to_trade() {
        let mut item = priced(Some(dec!(40)), None);
        item.quantity = dec!(3);
        assert_eq!(PricingEngine::line_total(&item), Some(dec!(120)));
        item.rrp = Some(dec!(60));
        assert_eq!(PricingEngine::line_total(&item), Some(dec!(180)));
        assert_eq!(PricingEngine::trade_line_total(&item), Some(dec!(120)));
        assert_eq!(PricingEngine::line_total(&priced(None, None)), Some(Decimal::ZERO));
    }

    #[test]
    fn test_line_total_includes_marked_up_components() {
        let mut item = priced(Some(dec!(100)), Some(dec!(150)));
        item.markup_percent = Some(dec!(50));
        item.components.push(PricedComponent {
            name: "Fabric".to_string(),
            price: dec!(20),
            quantity: dec!(2),
        });
        // 150 × 1 + 20 × 1.5 × 2
        assert_eq!(PricingEngine::line_total(&item), Some(dec!(210)));
        // 100 × 1 + 20 × 2
        assert_eq!(PricingEngine::trade_line_total(&item), Some(dec!(140)));
    }

    #[test]
    fn test_out_of_range_edits_rejected_without_panic() {
        let item = priced(Some(dec!(100000000000000000000)), None);
        let err = PricingEngine::plan_edit(&item, &PriceEdit::MarkupPercent(Some(dec!(10000000000000000000))))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPrice { ref field, .. } if field == "markupPercent"));

        assert!(PricingEngine::plan_edit(&item, &PriceEdit::Rrp(Some(dec!(1000000000001)))).is_err());
        assert!(PricingEngine::plan_edit(&item, &PriceEdit::Rrp(Some(dec!(1000000000000)))).is_ok());
    }

    #[test]
    fn test_derived_price_above_ceiling_rejected() {
        // 存量数据中的超大采购价: 加价率本身合法,派生 rrp 超限
        let item = priced(Some(dec!(100000000000000000000)), None);
        let err = PricingEngine::plan_edit(&item, &PriceEdit::MarkupPercent(Some(dec!(50)))).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPrice { ref field, .. } if field == "rrp"));

        let near_max = priced(Some(Decimal::MAX), None);
        assert!(PricingEngine::plan_edit(&near_max, &PriceEdit::MarkupPercent(Some(dec!(100000)))).is_err());
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let mut item = priced(None, Some(Decimal::MAX));
        item.quantity = dec!(2);
        assert_eq!(PricingEngine::line_total(&item), None);
        assert_eq!(PricingEngine::trade_line_total(&item), None);
    }
}
