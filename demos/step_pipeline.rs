//! Step Pipeline
//!
//! This example shows the pipeline and the recovery primitives on their own.
//!
//! Key concepts:
//! - Pipelines report the 1-based step that failed or panicked
//! - `recover` and `Try` turn panics into values
//! - `run_group` runs tasks on scoped threads and collects their failures
//!
//! Run with: RUST_LOG=debug cargo run --example step_pipeline

use statewalk::core::Context;
use statewalk::pipeline::Pipeline;
use statewalk::recovery::{recover, run_group, Task, Try};
use statewalk::BoxError;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn trim(text: String) -> Result<String, BoxError> {
    Ok(text.trim().to_string())
}

fn shout(text: String) -> Result<String, BoxError> {
    Ok(text.to_uppercase())
}

fn reject_empty(text: String) -> Result<String, BoxError> {
    if text.is_empty() {
        return Err("empty input".into());
    }
    Ok(text)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Pipeline ===\n");

    let pipeline = Pipeline::new()
        .then(trim)
        .then(reject_empty)
        .then(shout)
        .then(|text: String| -> Result<String, BoxError> {
            if text.contains("BOOM") {
                panic!("refusing to shout {text}");
            }
            Ok(text + "!")
        });

    for input in ["  hello  ", "   ", "boom"] {
        match pipeline.exec(input.to_string()) {
            Ok(out) => println!("{input:?} -> {out:?}"),
            Err(err) => println!("{input:?} -> step #{} stopped it: {err}", err.step()),
        }
    }

    println!("\n=== Recovery ===\n");

    if let Err(err) = recover(|| {
        let values: Vec<u8> = Vec::new();
        println!("{}", values[3]);
    }) {
        println!("recovered: {}", err.message());
        println!("at: {}", err.location().unwrap_or("<unknown>"));
    }

    let mut log = Vec::new();
    let ran_cleanly = Try::new(|| panic!("flaky"))
        .catch(|err| log.push(format!("caught {}", err.message())))
        .finally(|| println!("cleanup ran"))
        .run();
    println!("ran cleanly: {ran_cleanly}, log: {log:?}");

    println!("\n=== Task group ===\n");

    let ctx = Context::background().with_timeout(Duration::from_secs(1));
    let mut tasks: Vec<Task<'_>> = Vec::new();
    tasks.push(Box::new(|_ctx: &Context| -> Result<(), BoxError> { Ok(()) }));
    tasks.push(Box::new(|_ctx: &Context| -> Result<(), BoxError> {
        Err("upstream unavailable".into())
    }));
    tasks.push(Box::new(|ctx: &Context| -> Result<(), BoxError> {
        ctx.check()?;
        panic!("worker crashed");
    }));

    for failure in run_group(&ctx, tasks) {
        println!("{failure}");
    }
}
