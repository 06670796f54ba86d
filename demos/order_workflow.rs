//! Order Workflow
//!
//! This example walks orders through a fulfilment graph.
//!
//! Key concepts:
//! - Declaring states with `state_enum!`
//! - Building a machine whose registration errors are all reported at once
//! - The three clean stops: terminal, unregistered state, end of sequence
//! - Step failures and panics surfacing as `ApplyError`
//! - Walk reports serialized with serde
//!
//! Run with: RUST_LOG=debug cargo run --example order_workflow

use statewalk::builder::{StateMachineBuilder, TransitionBuilder};
use statewalk::core::Context;
use statewalk::machine::{StepError, StepResult, Transition};
use statewalk::state_enum;
use tracing_subscriber::EnvFilter;

state_enum! {
    enum OrderState {
        Placed,
        Paid,
        Packed,
        Shipped,
        Archived,
    }
}

#[derive(Debug, Clone, Default)]
struct Order {
    items: Vec<&'static str>,
    balance: u32,
    total: u32,
    log: Vec<String>,
}

fn price(_ctx: &Context, mut order: Order) -> StepResult<Order> {
    if order.items.is_empty() {
        order.log.push("nothing to ship".to_string());
        return Err(StepError::stop(order));
    }
    order.total = order.items.len() as u32 * 15;
    order.log.push(format!("priced at {}", order.total));
    Ok(order)
}

fn charge(ctx: &Context, mut order: Order) -> StepResult<Order> {
    ctx.check()?;
    if order.balance < order.total {
        return Err(StepError::failed(format!(
            "insufficient funds: need {}, have {}",
            order.total, order.balance
        )));
    }
    order.balance -= order.total;
    order.log.push("charged".to_string());
    Ok(order)
}

fn pack(_ctx: &Context, mut order: Order) -> StepResult<Order> {
    if order.items.contains(&"glass") {
        panic!("dropped the glass");
    }
    order.log.push(format!("packed {} items", order.items.len()));
    Ok(order)
}

fn ship(_ctx: &Context, mut order: Order) -> StepResult<Order> {
    order.log.push("shipped".to_string());
    Ok(order)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Order Workflow ===\n");

    let machine = StateMachineBuilder::new()
        .name("orders")
        .capacity(4)
        .transition(
            TransitionBuilder::new()
                .from(OrderState::Placed)
                .to(OrderState::Paid)
                .step(price)
                .step(charge),
        )
        .and_then(|b| {
            b.transition(
                TransitionBuilder::new()
                    .from(OrderState::Paid)
                    .to(OrderState::Packed)
                    .step(pack),
            )
        })
        .and_then(|b| {
            b.transition(
                TransitionBuilder::new()
                    .from(OrderState::Packed)
                    .to(OrderState::Shipped)
                    .step(ship),
            )
        })
        .and_then(|b| b.build());

    let machine = match machine {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("could not build machine: {err}");
            return;
        }
    };

    let orders = [
        ("happy path", vec!["book", "lamp"], 100),
        ("empty cart", vec![], 100),
        ("poor customer", vec!["book", "lamp", "desk"], 20),
        ("fragile goods", vec!["glass"], 100),
    ];

    let ctx = Context::background();
    for (label, items, balance) in orders {
        let order = Order {
            items,
            balance,
            ..Order::default()
        };

        println!("-- {label}");
        let (result, report) = machine.apply_with_report(&ctx, OrderState::Placed, order);
        match result {
            Ok(order) => println!("   ok: {:?}", order.log),
            Err(err) => println!("   error in {} (step #{}): {err}", err.state(), err.step()),
        }
        println!(
            "   path: {:?}, ended in {:?}",
            report.path(),
            report.end()
        );
        if let Ok(json) = serde_json::to_string(&report) {
            println!("   report: {json}");
        }
        println!();
    }

    println!("=== Rejected registrations ===\n");

    let rejected = StateMachineBuilder::<OrderState, Order>::new()
        .add_transition(Transition::to(OrderState::Shipped, OrderState::Archived).step(ship))
        .add_transition(Transition::to(OrderState::Archived, OrderState::Shipped).step(ship))
        .add_transition(Transition::to(OrderState::Packed, OrderState::Packed).step(ship))
        .add_transition(Transition::terminal(OrderState::Placed))
        .build();

    if let Err(err) = rejected {
        for rejection in err.rejections() {
            println!("   {rejection}");
        }
    }
}
