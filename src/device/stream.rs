use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, error};

use super::completion::Completion;
use crate::error::IndexError;

type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);
static DEFAULT_STREAM: OnceLock<Stream> = OnceLock::new();

/// 执行流：按提交顺序串行执行任务的队列，由一个专属工作线程驱动。
///
/// 同一流上的任务严格按提交顺序执行；不同流之间互不约束，
/// 除非调用方用 [`Stream::wait_event`] 显式建立依赖。
/// 所有克隆共享同一个队列；最后一个克隆释放后，工作线程执行完剩余任务即退出。
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    id: u64,
    sender: Sender<Task>,
    issued: AtomicU64,
}

/// 在流上记录的完成标记
#[derive(Clone)]
pub struct Event {
    done: Arc<Completion<()>>,
}

impl Stream {
    pub fn new() -> Self {
        let id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded::<Task>();
        let spawned = thread::Builder::new()
            .name(format!("sketchmap-stream-{}", id))
            .spawn(move || {
                for task in receiver {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                        error!(stream = id, "task panicked: {}", panic_message(&*payload));
                    }
                }
                debug!(stream = id, "stream worker exiting");
            });
        if let Err(e) = spawned {
            // 无法创建线程时退化为在提交线程上同步执行（见 enqueue）
            error!(stream = id, "cannot spawn stream worker: {}", e);
        }
        Self { inner: Arc::new(StreamInner { id, sender, issued: AtomicU64::new(0) }) }
    }

    /// 进程内共享的默认流
    pub fn default_stream() -> Stream {
        DEFAULT_STREAM.get_or_init(Stream::new).clone()
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// 已提交到该流的任务数
    pub fn issued(&self) -> u64 {
        self.inner.issued.load(Ordering::Relaxed)
    }

    /// 异步提交任务，立即返回
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.issued.fetch_add(1, Ordering::Relaxed);
        if let Err(rejected) = self.inner.sender.send(Box::new(task)) {
            // worker is gone; keep issue-order semantics by running inline
            (rejected.into_inner())();
        }
    }

    /// 记录一个事件：当此前提交的所有任务完成后事件被触发
    pub fn record_event(&self) -> Event {
        let event = Event { done: Arc::new(Completion::new()) };
        let done = Arc::clone(&event.done);
        self.enqueue(move || done.complete(Ok(())));
        event
    }

    /// 让该流后续任务等待另一个事件完成
    pub fn wait_event(&self, event: &Event) {
        let event = event.clone();
        self.enqueue(move || event.wait());
    }

    /// 阻塞直到此前提交的任务全部完成
    pub fn synchronize(&self) {
        self.record_event().wait();
    }

    /// 两个句柄是否指向同一个流
    pub fn same_stream(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::default_stream()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("id", &self.inner.id).field("issued", &self.issued()).finish()
    }
}

impl Event {
    /// 非阻塞查询
    pub fn query(&self) -> bool {
        self.done.is_done()
    }

    pub fn wait(&self) {
        let _ = self.done.wait();
    }
}

/// 将 panic 负载转为可读消息
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 在流任务内运行一个阶段；panic 转换为 [`IndexError::StageFailed`]。
pub(crate) fn run_stage<T>(stage: &str, f: impl FnOnce() -> crate::error::Result<T>) -> crate::error::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(payload) => Err(IndexError::stage_failed(stage, panic_message(&*payload))),
    }
}
