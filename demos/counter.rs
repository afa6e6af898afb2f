//! This demo renders a tiny counter component a few times and shows which
//! memoized values survive across passes.

use std::sync::Arc;

use memoslot::{Callback, HookError, RenderContext, Runtime, deps};

fn main() -> Result<(), HookError> {
    let runtime = Runtime::new();
    let counter = runtime.mount("Counter");

    let first = runtime.render(counter, |cx| render(cx, 1, "clicks"))?; // [Miss] Fresh slots.
    let second = runtime.render(counter, |cx| render(cx, 1, "clicks"))?; // [Hit] Nothing changed.
    let third = runtime.render(counter, |cx| render(cx, 2, "clicks"))?; // [Miss] The step changed.

    println!("{}", first.title);
    println!("same handler after pass 2: {}", Callback::ptr_eq(&first.on_click, &second.on_click));
    println!("same handler after pass 3: {}", Callback::ptr_eq(&second.on_click, &third.on_click));
    println!("5 clicked once: {}", third.on_click.call(5));

    runtime.unmount(counter);
    Ok(())
}

/// What the counter hands to its children.
struct View {
    title: Arc<String>,
    on_click: Callback<i32, i32>,
}

/// The render routine of the counter.
fn render(cx: &mut RenderContext, step: i32, unit: &'static str) -> Result<View, HookError> {
    let title = cx.memoize(|| Arc::new(format!("Counting {unit} by {step}")), deps![step, unit])?;
    let on_click = cx.callback(move |count: i32| count + step, deps![step])?;
    Ok(View { title, on_click })
}
