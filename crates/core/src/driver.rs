//! 并发调度
//!
//! 固定大小的 rayon 线程池，每个 worker 任务用工厂函数构建自己的提取器，
//! 任务之间只通过文档游标和结果通道传递数据。结果按完成顺序回调；
//! 单个文档的错误或 panic 只影响该文档。

use crate::document::Document;
use crate::extractor::ExtractError;
use crate::logging::Logger;
use crate::table::MatchRecord;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

/// 单个任务的分类错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// 资源保护拒绝（图像过大），记入跳过台账
    #[error("{0}")]
    ResourceGuard(String),
    #[error("{0}")]
    Failed(String),
}

impl From<ExtractError> for TaskError {
    fn from(err: ExtractError) -> Self {
        if err.is_resource_guard() {
            TaskError::ResourceGuard(err.to_string())
        } else {
            TaskError::Failed(err.to_string())
        }
    }
}

/// 在 worker 线程内处理单个文档
pub trait Worker {
    type Output: Send;

    fn process(&mut self, document: &Document) -> Result<Self::Output, TaskError>;
}

/// 一个已完成的任务
#[derive(Debug)]
pub struct Completion<T> {
    pub document: Document,
    pub result: Result<T, TaskError>,
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    logger: Logger,
}

impl WorkerPool {
    pub fn new(workers: usize, logger: Logger) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|index| format!("scanmatch-worker-{}", index))
            .build()?;
        Ok(Self { pool, logger })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// 处理全部文档，每完成一个调用一次 `on_complete`（在调用线程上）
    ///
    /// 每个 worker 任务内调用 `factory`；worker panic 后会被丢弃并在下一个任务时重建。
    pub fn run<W, F, C>(&self, documents: &[Document], factory: F, mut on_complete: C)
    where
        W: Worker,
        F: Fn() -> Result<W, TaskError> + Sync,
        C: FnMut(Completion<W::Output>),
    {
        if documents.is_empty() {
            return;
        }

        let workers = self.workers().min(documents.len());
        log::debug!(
            logger: self.logger,
            "[Driver] 启动 {} 个 worker 处理 {} 个文档",
            workers,
            documents.len()
        );

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<Completion<W::Output>>();

        self.pool.in_place_scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let factory = &factory;
                scope.spawn(move |_| {
                    let mut slot: Option<W> = None;
                    while let Some(document) = documents.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                        let result = run_task(&mut slot, factory, document);
                        let completion = Completion {
                            document: document.clone(),
                            result,
                        };
                        if tx.send(completion).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for completion in rx {
                on_complete(completion);
            }
        });
    }
}

fn run_task<W, F>(slot: &mut Option<W>, factory: &F, document: &Document) -> Result<W::Output, TaskError>
where
    W: Worker,
    F: Fn() -> Result<W, TaskError>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<W::Output, TaskError> {
        let mut worker = match slot.take() {
            Some(worker) => worker,
            None => factory()?,
        };
        let result = worker.process(document);
        *slot = Some(worker);
        result
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Failed(format!(
            "worker panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 一次标记提取运行的汇总
#[derive(Debug, Default)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    /// 至少有一条匹配的文档数
    pub matched_documents: usize,
    /// 按文档标识、页码排序
    pub matches: Vec<MatchRecord>,
    /// (文件名, 原因)，按文件名排序
    pub skipped: Vec<(String, String)>,
    /// (文件名, 错误)，按文件名排序
    pub errors: Vec<(String, String)>,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped.len() + self.errors.len()
    }
}

/// 并发运行标记提取并汇总结果
pub fn run_extraction<W, F>(pool: &WorkerPool, documents: &[Document], factory: F) -> RunReport
where
    W: Worker<Output = Vec<MatchRecord>>,
    F: Fn() -> Result<W, TaskError> + Sync,
{
    let logger = pool.logger().clone();
    let start = Instant::now();
    let mut report = RunReport {
        total: documents.len(),
        ..RunReport::default()
    };

    log::info!(logger: logger, "[Driver] 找到 {} 个 PDF 文件", documents.len());

    pool.run(documents, factory, |completion| {
        let name = completion.document.file_name();
        match completion.result {
            Ok(records) if records.is_empty() => {
                report.succeeded += 1;
                log::info!(
                    logger: logger,
                    "[Driver] ({}/{}) {} 未找到匹配",
                    report.processed(),
                    report.total,
                    name
                );
            }
            Ok(records) => {
                report.succeeded += 1;
                report.matched_documents += 1;
                log::info!(
                    logger: logger,
                    "[Driver] ({}/{}) {} 找到 {} 条匹配",
                    report.processed(),
                    report.total,
                    name,
                    records.len()
                );
                report.matches.extend(records);
            }
            Err(TaskError::ResourceGuard(reason)) => {
                log::warn!(logger: logger, "[Driver] 跳过 {}: {}", name, reason);
                report.skipped.push((name, reason));
            }
            Err(TaskError::Failed(message)) => {
                log::error!(logger: logger, "[Driver] 处理 {} 失败: {}", name, message);
                report.errors.push((name, message));
            }
        }
    });

    // 完成顺序不确定，输出前统一排序
    report
        .matches
        .sort_by(|a, b| a.document_id().cmp(&b.document_id()).then(a.page.cmp(&b.page)));
    report.skipped.sort();
    report.errors.sort();

    log::info!(
        logger: logger,
        "[Driver] 处理完成：共 {} 个，成功 {} 个（{} 个有匹配），跳过 {} 个，失败 {} 个，耗时 {} s",
        report.total,
        report.succeeded,
        report.matched_documents,
        report.skipped.len(),
        report.errors.len(),
        start.elapsed().as_secs()
    );

    report
}
