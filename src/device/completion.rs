use std::sync::OnceLock;

use parking_lot::{Condvar, Mutex};

use crate::error::{IndexError, Result};

/// 一次性写入的异步结果（promise）。
///
/// 生产方（流上的任务）调用 [`Completion::complete`] 写入结果，
/// 消费方用 [`Completion::is_done`] 轮询或用 [`Completion::wait`] 阻塞等待。
/// 失败结果同样会唤醒等待者，因此等待不会因任务失败而挂起。
pub struct Completion<T> {
    value: OnceLock<Result<T>>,
    lock: Mutex<()>,
    cond: Condvar,
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self { value: OnceLock::new(), lock: Mutex::new(()), cond: Condvar::new() }
    }

    /// 已完成的结果（用于同步构造的空索引等）
    pub fn ready(value: T) -> Self {
        let c = Self::new();
        c.complete(Ok(value));
        c
    }

    /// 写入结果；重复写入被忽略（仅第一次生效）。
    pub fn complete(&self, result: Result<T>) {
        if self.value.set(result).is_err() {
            tracing::warn!("completion already resolved, ignoring second result");
            return;
        }
        // 在锁内通知，避免与 wait 中的检查产生丢失唤醒
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    /// 是否已有结果（成功或失败），不阻塞
    pub fn is_done(&self) -> bool {
        self.value.get().is_some()
    }

    /// 是否成功完成，不阻塞
    pub fn is_ok(&self) -> bool {
        matches!(self.value.get(), Some(Ok(_)))
    }

    /// 阻塞直到有结果
    pub fn wait(&self) -> std::result::Result<&T, &IndexError> {
        if let Some(r) = self.value.get() {
            return r.as_ref();
        }
        let mut guard = self.lock.lock();
        loop {
            if let Some(r) = self.value.get() {
                return r.as_ref();
            }
            self.cond.wait(&mut guard);
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}
