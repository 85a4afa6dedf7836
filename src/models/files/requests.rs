/// 新文件记录（用于存储层）
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_name: String,
    pub stored_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub user_id: i64,
}
