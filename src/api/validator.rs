// ==========================================
// FFE 规格项跟踪系统 - 人工输入校验器
// ==========================================
// 职责: 持久化之前的输入校验（文档编码唯一性、名称、数量、子部件）
// 红线: 校验失败时规格项保持不变,不发起任何持久化调用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::spec_item::PricedComponent;
use crate::engine::error::WorkflowError;
use crate::engine::item_store::SpecItemStore;
use crate::engine::pricing::max_price;
use rust_decimal::Decimal;

/// 文档编码最大长度
pub const MAX_DOC_CODE_LEN: usize = 64;
/// 数量上限（规格项与子部件）
pub const MAX_QUANTITY_UNITS: i64 = 1_000_000;

// ==========================================
// InputValidator
// ==========================================
pub struct InputValidator;

impl InputValidator {
    /// 规范化文档编码: 去除首尾空白,空串视为清空
    pub fn normalize_doc_code(raw: Option<&str>) -> ApiResult<Option<String>> {
        let Some(code) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        if code.chars().count() > MAX_DOC_CODE_LEN {
            return Err(ApiError::InvalidInput(format!(
                "文档编码过长（最多{}个字符）: {}",
                MAX_DOC_CODE_LEN, code
            )));
        }
        Ok(Some(code.to_string()))
    }

    /// 文档编码在项目内唯一（忽略大小写,只与未归档规格项比较）
    pub fn ensure_doc_code_unique(
        store: &SpecItemStore,
        item_id: &str,
        doc_code: &str,
    ) -> ApiResult<()> {
        if let Some(conflict) = store.find_doc_code_conflict(doc_code, item_id) {
            return Err(WorkflowError::DuplicateDocCode {
                doc_code: doc_code.to_string(),
                conflicting_item_id: conflict.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// 产品名称不能为空
    pub fn normalize_name(raw: &str) -> ApiResult<String> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("名称不能为空".to_string()));
        }
        Ok(name.to_string())
    }

    /// 数量: 0 ≤ quantity ≤ MAX_QUANTITY_UNITS
    pub fn ensure_quantity(quantity: Decimal) -> ApiResult<()> {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(ApiError::InvalidInput(format!("数量不能为负数: {}", quantity)));
        }
        if quantity > Decimal::from(MAX_QUANTITY_UNITS) {
            return Err(ApiError::InvalidInput(format!(
                "数量超出上限 {}: {}",
                MAX_QUANTITY_UNITS, quantity
            )));
        }
        Ok(())
    }

    /// 子部件价格不超过单价上限,数量规则同规格项
    pub fn ensure_components(components: &[PricedComponent]) -> ApiResult<()> {
        for component in components {
            if component.price < Decimal::ZERO || component.price > max_price() {
                return Err(ApiError::InvalidInput(format!(
                    "子部件 {} 的价格超出范围: {}",
                    component.name, component.price
                )));
            }
            Self::ensure_quantity(component.quantity).map_err(|_| {
                ApiError::InvalidInput(format!(
                    "子部件 {} 的数量超出范围: {}",
                    component.name, component.quantity
                ))
            })?;
        }
        Ok(())
    }
}
