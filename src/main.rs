// ==========================================
// FFE 规格项跟踪系统 - 命令行入口
// ==========================================
// 用法: ffe-spec-tracker <project_id> [room_id]
// 输出: 项目（或房间）的分币种汇总与需求关联统计（JSON）
// ==========================================

use anyhow::{bail, Context};
use ffe_spec_tracker::app::{get_default_db_path, AppState};
use ffe_spec_tracker::domain::ALL_ACTION_TYPES;
use ffe_spec_tracker::engine::ItemFilter;
use serde_json::json;
use std::collections::BTreeMap;

/// 报告中展示的最近操作条数
const RECENT_ACTIVITY_LIMIT: i32 = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ffe_spec_tracker::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", ffe_spec_tracker::APP_NAME, ffe_spec_tracker::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let Some(project_id) = args.next() else {
        bail!("用法: ffe-spec-tracker <project_id> [room_id]");
    };
    let room_id = args.next();

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let api = state
        .open_project(&project_id, "cli")
        .await
        .with_context(|| format!("无法打开项目 {}", project_id))?;

    let filter = match &room_id {
        Some(room) => ItemFilter::for_room(room),
        None => ItemFilter::default(),
    };
    let summary = api.compute_aggregates(&filter);
    let requirements = api.requirement_views(room_id.as_deref()).await?;

    // 状态分布（显示名）
    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();
    let in_scope = |room: Option<&str>| room_id.is_none() || room == room_id.as_deref();
    for item in api
        .items()
        .into_iter()
        .filter(|item| !item.is_archived() && in_scope(item.room_id.as_deref()))
    {
        *statuses
            .entry(ffe_spec_tracker::i18n::display_label(item.status.to_db_str()))
            .or_default() += 1;
    }

    // 操作日志: 最近记录与按类型计数（只列出出现过的类型）
    let recent_activity = state
        .action_log_repo
        .find_recent(&project_id, RECENT_ACTIVITY_LIMIT)?;
    let mut activity_counts: BTreeMap<&str, i64> = BTreeMap::new();
    for action_type in ALL_ACTION_TYPES {
        let count = state
            .action_log_repo
            .count_by_action_type(&project_id, action_type)?;
        if count > 0 {
            activity_counts.insert(action_type.to_db_str(), count);
        }
    }

    let report = json!({
        "project_id": project_id,
        "room_id": room_id,
        "summary": summary,
        "statuses": statuses,
        "requirements": requirements,
        "unconfirmed": api.unconfirmed_items(),
        "recent_activity": recent_activity,
        "activity_counts": activity_counts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
