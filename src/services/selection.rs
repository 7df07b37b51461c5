//! 字段选择存储 - 业务能力层
//!
//! 只负责"当前上传的字段列表 + 每个字段是否选中"

use tracing::debug;

use crate::models::FieldRecord;

/// 提供给界面渲染的字段视图
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub index: usize,
    pub type_label: String,
    pub value: String,
    pub selected: bool,
}

/// 类型为空时界面上显示的占位文字
pub const EMPTY_TYPE_LABEL: &str = "유형";

/// 字段选择存储
///
/// 约束：
/// - 列表只能整体替换，不做增量合并
/// - 切换选择只改一个记录的 `selected`，不改顺序、不删记录
/// - 每次整体替换都会递增 `generation`，旧的视图随之失效
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    records: Vec<FieldRecord>,
    generation: u64,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换字段列表
    pub fn replace_all(&mut self, records: Vec<FieldRecord>) {
        debug!(
            "替换字段列表: {} → {} 个 (generation {})",
            self.records.len(),
            records.len(),
            self.generation + 1
        );
        self.records = records;
        self.generation += 1;
    }

    /// 清空（等价于替换为空列表）
    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    /// 设置某个字段的选择状态
    ///
    /// 索引越界时什么都不做，返回 `false`
    pub fn toggle(&mut self, index: usize, selected: bool) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.selected = selected;
                true
            }
            None => {
                debug!("忽略越界的切换: {} (共 {} 个)", index, self.records.len());
                false
            }
        }
    }

    /// 全选 / 全不选
    pub fn set_all(&mut self, selected: bool) {
        for record in &mut self.records {
            record.selected = selected;
        }
    }

    /// 选中的字段，保持原顺序
    pub fn selected(&self) -> Vec<FieldRecord> {
        self.records.iter().filter(|r| r.selected).cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.records.iter().filter(|r| r.selected).count()
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn views(&self) -> Vec<FieldView> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, r)| FieldView {
                index,
                type_label: if r.field_type.is_empty() {
                    EMPTY_TYPE_LABEL.to_string()
                } else {
                    r.field_type.clone()
                },
                value: r.value.clone(),
                selected: r.selected,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_records() -> Vec<FieldRecord> {
        vec![
            FieldRecord::new("name", "Hong"),
            FieldRecord::new("ssn", "000101-1"),
            FieldRecord::new("phone", "010-0000-0000"),
        ]
    }

    #[test]
    fn test_replace_all_discards_previous_contents() {
        let mut store = SelectionStore::new();
        store.replace_all(three_records());
        store.toggle(0, false);

        store.replace_all(vec![FieldRecord::new("email", "a@b.c")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.selected(), vec![FieldRecord::new("email", "a@b.c")]);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_selected_preserves_order() {
        let mut store = SelectionStore::new();
        store.replace_all(three_records());
        store.toggle(1, false);

        let types: Vec<String> = store.selected().into_iter().map(|r| r.field_type).collect();
        assert_eq!(types, ["name", "phone"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_toggle_round_trip_restores_state() {
        let mut store = SelectionStore::new();
        store.replace_all(three_records());
        let before = store.records().to_vec();

        assert!(store.toggle(2, false));
        assert!(store.toggle(2, true));
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn test_out_of_range_toggle_is_noop() {
        let mut store = SelectionStore::new();
        store.replace_all(three_records());
        let before = store.records().to_vec();

        assert!(!store.toggle(3, false));
        assert_eq!(store.records(), before.as_slice());
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_set_all() {
        let mut store = SelectionStore::new();
        store.replace_all(three_records());

        store.set_all(false);
        assert!(store.selected().is_empty());
        store.set_all(true);
        assert_eq!(store.selected_count(), 3);
    }

    #[test]
    fn test_views_use_placeholder_for_empty_type() {
        let mut store = SelectionStore::new();
        store.replace_all(vec![FieldRecord::new("", "Hong")]);
        let views = store.views();
        assert_eq!(views[0].type_label, EMPTY_TYPE_LABEL);
        assert_eq!(views[0].index, 0);
    }
}
