//! worker 数量设置：环境变量优先，其次配置，最后按可用并行度

const DEFAULT_MAX_WORKERS: usize = 4;

/// 覆盖 worker 数量的环境变量
pub const WORKERS_ENV: &str = "SCANMATCH_WORKERS";

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|v| *v > 0)
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_MAX_WORKERS)
        .max(1)
}

pub fn resolve_worker_count(env: Option<&str>, configured: Option<usize>) -> usize {
    env.and_then(parse_positive)
        .or(configured.filter(|v| *v > 0))
        .unwrap_or_else(default_worker_count)
}

pub fn worker_count(configured: Option<usize>) -> usize {
    let env = std::env::var(WORKERS_ENV).ok();
    resolve_worker_count(env.as_deref(), configured)
}
