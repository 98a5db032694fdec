//! # 文件复制工具

use std::fs;
use std::path::Path;

use crate::error::{Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 复制单个文件，保留权限
pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    fs::copy(src, dst).with_context(|| format!("复制文件失败: {} -> {}", src.display(), dst.display()))?;
    let permissions = fs::metadata(src)?.permissions();
    fs::set_permissions(dst, permissions)?;
    Ok(())
}

/// 递归复制目录，遇到第一个错误即返回
pub fn copy_dir(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    let metadata = fs::metadata(src).with_context(|| format!("读取目录失败: {}", src.display()))?;

    fs::create_dir_all(dst)?;
    fs::set_permissions(dst, metadata.permissions())?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    ldebug!(
        "system",
        LogStage::Internal,
        LogComponent::Filesystem,
        "copy_dir",
        &format!("目录复制完成: {} -> {}", src.display(), dst.display())
    );
    Ok(())
}
