use std::cell::Cell;

use memoslot::{Config, Dependency, Deps, HookError, Runtime, changed, deps};
use quickcheck_macros::quickcheck;

/// Build a snapshot from a list of values.
fn snapshot<T: Dependency + Copy>(values: &[T]) -> Deps {
    values.iter().fold(Deps::new(), |deps, &value| deps.with(value))
}

#[quickcheck]
fn shallow_eq_agrees_with_vec_eq(a: Vec<i32>, b: Vec<i32>) -> bool {
    snapshot(&a).shallow_eq(&snapshot(&b)) == (a == b)
}

#[quickcheck]
fn absent_snapshots_always_change(values: Vec<u8>) -> bool {
    let deps = snapshot(&values);
    changed(None, Some(&deps)) && changed(Some(&deps), None) && changed(None, None)
}

#[quickcheck]
fn values_of_other_types_always_change(value: u16) -> bool {
    changed(Some(&deps![value]), Some(&deps![u32::from(value)]))
        && changed(Some(&deps![value, "tail"]), Some(&deps![value, String::from("tail")]))
}

#[quickcheck]
fn producer_runs_once_per_configuration(steps: Vec<u8>) -> bool {
    let runtime = Runtime::new();
    let id = runtime.mount("Prop");
    let calls = Cell::new(0);

    for &step in &steps {
        let value = runtime
            .render(id, |cx| {
                cx.memoize(
                    || {
                        calls.set(calls.get() + 1);
                        step
                    },
                    deps![step],
                )
            })
            .unwrap();
        if value != step {
            return false;
        }
    }

    let expected = steps
        .iter()
        .enumerate()
        .filter(|&(i, step)| i == 0 || steps[i - 1] != *step)
        .count();
    calls.get() == expected
}

#[quickcheck]
fn absent_dependencies_recompute_every_pass(passes: u8) -> bool {
    let runtime = Runtime::new();
    let id = runtime.mount("Prop");
    let calls = Cell::new(0);

    for _ in 0..passes {
        runtime
            .render(id, |cx| cx.memoize(|| calls.set(calls.get() + 1), None))
            .unwrap();
    }

    calls.get() == usize::from(passes)
}

#[quickcheck]
fn changed_call_count_is_detected(first: u8, second: u8) -> bool {
    let (first, second) = (first % 16, second % 16);
    let runtime = Runtime::with_config(Config::new().with_diagnostics(true));
    let id = runtime.mount("Loop");
    let render = |count: u8| {
        runtime.render(id, |cx| {
            for i in 0..count {
                cx.memoize(|| i, deps![])?;
            }
            Ok::<_, HookError>(())
        })
    };

    if render(first).is_err() {
        return false;
    }

    match render(second) {
        Ok(()) => first == second,
        // Extra calls fail on the first one past the recorded count.
        Err(HookError::CallOrderViolation { expected, actual, .. }) => {
            first != second
                && expected == usize::from(first)
                && actual == usize::from(second.min(first + 1))
        }
        Err(_) => false,
    }
}
