//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
/// Capacity of cpu_set_t in CPU indices (bits).
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(target_os = "linux")]
fn last_os_error(call: &str) -> eyre::Report {
    eyre::eyre!("{call} failed: {}", std::io::Error::last_os_error())
}

#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall only takes flags and has no memory-safety preconditions.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM);
    // All failed for lack of privilege or memory: settle for resident pages
    // SAFETY: as above.
    if lock == RtLock::All && retryable && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
        return Ok(());
    }
    let mut msg = format!("mlockall failed: {err}");
    if retryable {
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain queries on a constant policy.
    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(last_os_error("sched_setscheduler(SCHED_FIFO)").wrap_err(
            "hint: run with CAP_SYS_NICE, e.g. 'sudo setcap cap_sys_nice=ep /path/to/fatigue'",
        ));
    }
    Ok(prio_val)
}

#[cfg(target_os = "linux")]
fn apply_affinity(rt_cpu: Option<usize>) -> eyre::Result<usize> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO};

    let target = rt_cpu.unwrap_or(0);
    if target >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {target} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }
    // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set.
    let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `allowed` is a valid, correctly sized cpu_set_t.
    let rc = unsafe {
        CPU_ZERO(&mut allowed);
        libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed)
    };
    if rc != 0 {
        return Err(last_os_error("sched_getaffinity"));
    }
    // SAFETY: target < MAX_CPUSET_BITS.
    if !unsafe { CPU_ISSET(target, &allowed) } {
        eyre::bail!("CPU {target} not permitted by current affinity mask");
    }
    // SAFETY: as above.
    let mut desired: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `desired` is a valid cpu_set_t and target is in range.
    let rc = unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(target, &mut desired);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &desired)
    };
    if rc != 0 {
        return Err(last_os_error("sched_setaffinity"));
    }
    Ok(target)
}

/// Apply memory locking, FIFO priority and CPU pinning once per process.
/// Failures are logged and the run continues without that setting.
#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt memory lock"),
            Err(err) => tracing::warn!(error = %err, "rt memory lock not applied"),
        }
        match apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt SCHED_FIFO"),
            Err(err) => tracing::warn!(error = %format!("{err:#}"), "rt priority not applied"),
        }
        match apply_affinity(rt_cpu) {
            Ok(cpu) => tracing::info!(cpu, "rt affinity"),
            Err(err) => tracing::warn!(error = %err, "rt affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock, _rt_cpu: Option<usize>) {
    if rt {
        tracing::warn!("real-time mode is only supported on Linux; continuing without it");
    }
}
