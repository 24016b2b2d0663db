//! 預測提供者鏈
//!
//! 責任鏈：依序嘗試提供者（例如 ML 模型 → 歷史平均回退），
//! 個別失敗記錄後吞掉，全部失敗才回報 `ForecastUnavailable`。
//! 不假設任何單一提供者一定存在。

use planning_core::{DemandSource, PlanningError, PlanningHorizon, Result};

/// 預測提供者
pub trait ForecastProvider {
    /// 提供者名稱（供日誌識別）
    fn name(&self) -> &str;

    /// 產生時界內的預測需求
    fn forecast(&self, product_id: &str, horizon: &PlanningHorizon) -> Result<Vec<DemandSource>>;
}

/// 預測提供者責任鏈
#[derive(Default)]
pub struct ForecastChain {
    providers: Vec<Box<dyn ForecastProvider>>,
}

impl ForecastChain {
    /// 創建空的責任鏈
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入提供者（依加入順序嘗試）
    pub fn with_provider(mut self, provider: Box<dyn ForecastProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// 依序嘗試，回傳第一個成功的預測
    pub fn forecast(
        &self,
        product_id: &str,
        horizon: &PlanningHorizon,
    ) -> Result<Vec<DemandSource>> {
        for provider in &self.providers {
            match provider.forecast(product_id, horizon) {
                Ok(sources) => {
                    tracing::debug!(
                        "預測提供者 {} 回傳 {} 筆（物料 {}）",
                        provider.name(),
                        sources.len(),
                        product_id
                    );
                    return Ok(sources);
                }
                Err(err) => {
                    tracing::warn!("預測提供者 {} 失敗，嘗試下一個：{}", provider.name(), err);
                }
            }
        }

        Err(PlanningError::ForecastUnavailable(format!(
            "物料 {} 沒有任何提供者能產生預測",
            product_id
        )))
    }
}
