//! BOM 管理器
//!
//! 以 id 索引的 arena 保存 BOM，循環檢查只需集合成員測試，
//! 不在節點間嵌入引用。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use planning_core::{Bom, BomLine, PlanningError, Result, RevisionStatus};

use crate::MAX_EXPLOSION_DEPTH;

/// 展開結果（單一組件在某一層的需求）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplodedComponent {
    /// 組件物料ID
    pub product_id: String,

    /// 需求數量（含損耗，逐層放大）
    pub quantity: Decimal,

    /// 層級（1 = 頂層 BOM 的直接組件）
    pub level: u32,

    /// 計量單位
    pub uom: String,
}

/// 反查結果（組件被哪些 BOM 使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereUsedEntry {
    /// 使用該組件的 BOM
    pub bom_id: Uuid,

    /// BOM 所屬產品
    pub product_id: String,

    /// BOM 版本
    pub version: String,

    /// 行號
    pub line_number: u32,

    /// 單位用量
    pub quantity: Decimal,
}

/// BOM 管理器
#[derive(Debug, Default)]
pub struct BomManager {
    /// id 索引的 BOM 倉儲
    boms: HashMap<Uuid, Bom>,

    /// 產品 → BOM id 索引
    product_index: HashMap<String, Vec<Uuid>>,
}

impl BomManager {
    /// 創建空的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 創建新的 BOM（草稿），同產品版本字串不可重複
    pub fn create(
        &mut self,
        product_id: &str,
        version: &str,
        effective_from: NaiveDate,
    ) -> Result<Uuid> {
        self.insert(Bom::new(
            product_id.to_string(),
            version.to_string(),
            effective_from,
        ))
    }

    /// 放入既有 BOM（含行），同產品版本字串不可重複
    pub fn insert(&mut self, bom: Bom) -> Result<Uuid> {
        if self.version_exists(&bom.product_id, &bom.version) {
            return Err(PlanningError::InvalidVersion(format!(
                "產品 {} 已存在版本 {}",
                bom.product_id, bom.version
            )));
        }

        // 放入前逐行做前置循環檢查，避免持久化循環結構
        for line in &bom.lines {
            self.check_would_cycle(&bom.product_id, &line.component_id, bom.effective_from)?;
        }

        let id = bom.id;
        self.product_index
            .entry(bom.product_id.clone())
            .or_default()
            .push(id);
        self.boms.insert(id, bom);
        Ok(id)
    }

    /// 依 ID 取得 BOM
    pub fn get(&self, bom_id: Uuid) -> Result<&Bom> {
        self.boms
            .get(&bom_id)
            .ok_or(PlanningError::BomNotFound(bom_id))
    }

    fn get_mut(&mut self, bom_id: Uuid) -> Result<&mut Bom> {
        self.boms
            .get_mut(&bom_id)
            .ok_or(PlanningError::BomNotFound(bom_id))
    }

    /// 產品的所有版本
    pub fn find_all_versions(&self, product_id: &str) -> Vec<&Bom> {
        self.product_index
            .get(product_id)
            .map(|ids| ids.iter().filter_map(|id| self.boms.get(id)).collect())
            .unwrap_or_default()
    }

    fn version_exists(&self, product_id: &str, version: &str) -> bool {
        self.find_all_versions(product_id)
            .iter()
            .any(|b| b.version == version)
    }

    /// 指定日期生效的 BOM（僅已發布版本）
    pub fn get_effective(&self, product_id: &str, as_of: NaiveDate) -> Option<&Bom> {
        self.find_all_versions(product_id)
            .into_iter()
            .find(|b| b.status == RevisionStatus::Released && b.is_effective(as_of))
    }

    /// 指定日期生效的 BOM，找不到時回報錯誤
    pub fn require_effective(&self, product_id: &str, as_of: NaiveDate) -> Result<&Bom> {
        self.get_effective(product_id, as_of)
            .ok_or_else(|| PlanningError::NoEffectiveBom(product_id.to_string()))
    }

    /// 以新版本複製（帶前版連結），版本字串不可重複
    pub fn new_version(&mut self, bom_id: Uuid, new_version: &str) -> Result<Uuid> {
        let source = self.get(bom_id)?;
        if self.version_exists(&source.product_id, new_version) {
            return Err(PlanningError::InvalidVersion(format!(
                "產品 {} 已存在版本 {}",
                source.product_id, new_version
            )));
        }

        let mut cloned = source.clone();
        cloned.id = Uuid::new_v4();
        cloned.version = new_version.to_string();
        cloned.status = RevisionStatus::Draft;
        cloned.predecessor_id = Some(bom_id);

        let id = cloned.id;
        self.product_index
            .entry(cloned.product_id.clone())
            .or_default()
            .push(id);
        self.boms.insert(id, cloned);

        tracing::debug!("BOM {} 複製為新版本 {}", bom_id, new_version);
        Ok(id)
    }

    /// 調整草稿的生效區間
    pub fn set_effectivity(
        &mut self,
        bom_id: Uuid,
        effective_from: NaiveDate,
        effective_to: Option<NaiveDate>,
    ) -> Result<()> {
        let bom = self.get_mut(bom_id)?;
        if !bom.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM {} 非草稿狀態，不可修改",
                bom.version
            )));
        }
        bom.effective_from = effective_from;
        bom.effective_to = effective_to;
        Ok(())
    }

    /// 發布 BOM：拒絕空 BOM，並確保同產品已發布版本的生效區間不重疊
    pub fn release(&mut self, bom_id: Uuid) -> Result<()> {
        let bom = self.get(bom_id)?;
        if bom.status != RevisionStatus::Draft {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 非草稿狀態，不可發布",
                bom.version
            )));
        }
        if bom.lines.is_empty() {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 沒有任何行，不可發布",
                bom.version
            )));
        }

        // 同一時點只允許一份生效 BOM
        let conflict = self
            .find_all_versions(&bom.product_id)
            .into_iter()
            .find(|other| {
                other.id != bom_id
                    && other.status == RevisionStatus::Released
                    && other.overlaps(bom)
            })
            .map(|other| other.version.clone());

        if let Some(version) = conflict {
            return Err(PlanningError::InvalidVersion(format!(
                "生效區間與已發布版本 {} 重疊，請先作廢或調整區間",
                version
            )));
        }

        self.get_mut(bom_id)?.status = RevisionStatus::Released;
        tracing::info!("BOM {} 已發布", bom_id);
        Ok(())
    }

    /// 作廢已發布的 BOM
    pub fn make_obsolete(&mut self, bom_id: Uuid) -> Result<()> {
        let bom = self.get_mut(bom_id)?;
        if bom.status != RevisionStatus::Released {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 非已發布狀態，不可作廢",
                bom.version
            )));
        }
        bom.status = RevisionStatus::Obsolete;
        Ok(())
    }

    /// 添加 BOM 行（僅草稿；行號唯一；前置循環檢查）
    pub fn add_line(&mut self, bom_id: Uuid, line: BomLine) -> Result<()> {
        let bom = self.get(bom_id)?;
        if !bom.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 非草稿狀態，不可修改",
                bom.version
            )));
        }
        if bom.find_line(line.line_number).is_some() {
            return Err(PlanningError::InvalidVersion(format!(
                "行號 {} 已存在",
                line.line_number
            )));
        }

        self.check_would_cycle(&bom.product_id, &line.component_id, bom.effective_from)?;

        let bom = self.get_mut(bom_id)?;
        bom.lines.push(line);
        bom.lines.sort_by_key(|l| l.line_number);
        Ok(())
    }

    /// 更新 BOM 行（僅草稿；前置循環檢查）
    pub fn update_line(&mut self, bom_id: Uuid, line: BomLine) -> Result<()> {
        let bom = self.get(bom_id)?;
        if !bom.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 非草稿狀態，不可修改",
                bom.version
            )));
        }
        if bom.find_line(line.line_number).is_none() {
            return Err(PlanningError::InvalidVersion(format!(
                "行號 {} 不存在",
                line.line_number
            )));
        }

        self.check_would_cycle(&bom.product_id, &line.component_id, bom.effective_from)?;

        let bom = self.get_mut(bom_id)?;
        if let Some(existing) = bom
            .lines
            .iter_mut()
            .find(|l| l.line_number == line.line_number)
        {
            *existing = line;
        }
        Ok(())
    }

    /// 移除 BOM 行（僅草稿）
    pub fn remove_line(&mut self, bom_id: Uuid, line_number: u32) -> Result<()> {
        let bom = self.get(bom_id)?;
        if !bom.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "BOM 版本 {} 非草稿狀態，不可修改",
                bom.version
            )));
        }
        if bom.find_line(line_number).is_none() {
            return Err(PlanningError::InvalidVersion(format!(
                "行號 {} 不存在",
                line_number
            )));
        }

        let bom = self.get_mut(bom_id)?;
        bom.lines.retain(|l| l.line_number != line_number);
        Ok(())
    }

    /// 多層展開：逐層放大需求量，父件先於子件輸出
    ///
    /// 同一路徑重複出現的物料視為循環，立即失敗；
    /// 深度超過上限的分支不再展開。
    pub fn explode(
        &self,
        bom_id: Uuid,
        parent_qty: Decimal,
        as_of: NaiveDate,
    ) -> Result<Vec<ExplodedComponent>> {
        let bom = self.get(bom_id)?;
        let mut path = vec![bom.product_id.clone()];
        let mut out = Vec::new();
        self.explode_recursive(bom, parent_qty, as_of, 1, &mut path, &mut out)?;
        Ok(out)
    }

    fn explode_recursive(
        &self,
        bom: &Bom,
        parent_qty: Decimal,
        as_of: NaiveDate,
        level: u32,
        path: &mut Vec<String>,
        out: &mut Vec<ExplodedComponent>,
    ) -> Result<()> {
        for line in bom.effective_lines(as_of) {
            let required = line.quantity_with_scrap() * parent_qty;

            out.push(ExplodedComponent {
                product_id: line.component_id.clone(),
                quantity: required,
                level,
                uom: line.uom.clone(),
            });

            if let Some(child) = self.get_effective(&line.component_id, as_of) {
                if path.contains(&line.component_id) {
                    let mut cycle_path = path.clone();
                    cycle_path.push(line.component_id.clone());
                    return Err(PlanningError::CircularDependency { path: cycle_path });
                }
                if level < MAX_EXPLOSION_DEPTH {
                    path.push(line.component_id.clone());
                    self.explode_recursive(child, required, as_of, level + 1, path, out)?;
                    path.pop();
                }
            }
        }
        Ok(())
    }

    /// 反查：組件被哪些 BOM 的哪些行使用
    pub fn where_used(&self, component_id: &str) -> Vec<WhereUsedEntry> {
        let mut entries = Vec::new();
        for bom in self.boms.values() {
            for line in &bom.lines {
                if line.component_id == component_id {
                    entries.push(WhereUsedEntry {
                        bom_id: bom.id,
                        product_id: bom.product_id.clone(),
                        version: bom.version.clone(),
                        line_number: line.line_number,
                        quantity: line.quantity,
                    });
                }
            }
        }
        entries
    }

    /// 前置循環檢查：沿候選組件的 BOM 樹尋找父件產品
    ///
    /// 在行被接受前執行，防止循環被寫入倉儲；
    /// 展開時的檢查則是針對既有資料的安全網，兩者並存。
    fn check_would_cycle(
        &self,
        parent_product_id: &str,
        component_id: &str,
        as_of: NaiveDate,
    ) -> Result<()> {
        if parent_product_id == component_id {
            return Err(PlanningError::CircularDependency {
                path: vec![parent_product_id.to_string(), component_id.to_string()],
            });
        }

        // 顯式堆疊走訪，路徑隨節點入棧
        let mut stack: Vec<Vec<String>> =
            vec![vec![parent_product_id.to_string(), component_id.to_string()]];

        while let Some(path) = stack.pop() {
            let current = path.last().expect("路徑不為空");
            let Some(bom) = self.get_effective(current, as_of) else {
                continue;
            };
            for line in &bom.lines {
                if line.component_id == parent_product_id {
                    let mut cycle_path = path.clone();
                    cycle_path.push(line.component_id.clone());
                    return Err(PlanningError::CircularDependency { path: cycle_path });
                }
                if !path.contains(&line.component_id) {
                    let mut next = path.clone();
                    next.push(line.component_id.clone());
                    stack.push(next);
                }
            }
        }
        Ok(())
    }

    /// 驗證 BOM：回傳完整問題清單而非逐一拋錯
    pub fn validate(&self, bom_id: Uuid) -> Result<Vec<String>> {
        let bom = self.get(bom_id)?;
        let mut problems = Vec::new();

        if bom.lines.is_empty() {
            problems.push("BOM 沒有任何行".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for line in &bom.lines {
            if !seen.insert(line.line_number) {
                problems.push(format!("行號 {} 重複", line.line_number));
            }
            if line.quantity <= Decimal::ZERO {
                problems.push(format!("行 {} 用量必須為正數", line.line_number));
            }
            if line.scrap_pct < Decimal::ZERO || line.scrap_pct >= Decimal::ONE_HUNDRED {
                problems.push(format!("行 {} 損耗率超出範圍 [0, 100)", line.line_number));
            }
        }

        // 嘗試展開以揪出深層循環
        if let Err(err) = self.explode(bom_id, Decimal::ONE, bom.effective_from) {
            problems.push(format!("展開失敗: {err}"));
        }

        Ok(problems)
    }
}
