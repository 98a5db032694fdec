//! # 通用工具
//!
//! 标识符生成、哈希、分页、类型转换与文件复制。

pub mod conversion;
pub mod fs;
pub mod hash;
pub mod id_generator;
pub mod pagination;

pub use conversion::{parse_f64, parse_i64, parse_query_map, parse_u64, round_half_away, user_id_from_json};
pub use fs::{copy_dir, copy_file};
pub use hash::{check_password, hash_password, hash_password_with_cost, md5_hex};
pub use id_generator::{
    Charset, OrderIdGenerator, generate_key, generate_name, generate_order_id, generate_order_no,
    generate_random_mixed, generate_random_number, generate_random_password, generate_random_special,
    generate_random_string,
};
pub use pagination::{PaginationInfo, PaginationParams, build_page, paginate, total_pages};
