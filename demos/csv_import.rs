use async_trait::async_trait;
use hataori::prelude::*;
use hataori::{InvalidItem, TracingListener};
use std::sync::Arc;

#[derive(Debug)]
struct Order {
    id: u32,
    amount_cents: u64,
}

struct ParseOrder;

#[async_trait]
impl ItemProcessor<String, Order> for ParseOrder {
    async fn process(&self, line: String) -> Processed<Order> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        let [id, amount] = parts.as_slice() else {
            return Processed::skipped("expected id,amount", line.clone().into());
        };
        match (id.parse(), amount.parse()) {
            (Ok(id), Ok(amount_cents)) => Processed::Transformed(Order { id, amount_cents }),
            _ => Processed::Skipped(
                InvalidItem::new("unparsable order %line%", line.clone().into())
                    .with_parameter("%line%", line.as_str()),
            ),
        }
    }
}

struct PrintOrders;

#[async_trait]
impl ItemWriter<Order> for PrintOrders {
    async fn write(&self, items: &[Order]) -> Result<(), BatchError> {
        let total: u64 = items.iter().map(|o| o.amount_cents).sum();
        println!(
            "writing {} orders ({:?}), total {} cents",
            items.len(),
            items.iter().map(|o| o.id).collect::<Vec<_>>(),
            total
        );
        Ok(())
    }
}

fn read_orders() -> Vec<String> {
    (1..=12)
        .map(|i| {
            if i % 5 == 0 {
                format!("{i},not-a-number")
            } else {
                format!("{i},{}", i * 1_000)
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let job = Job::builder("order_import")
        .add_step(
            "orders",
            ItemStep::new(read_orders, ParseOrder, PrintOrders)
                .with_config(ItemStepConfig::with_batch_size(4)),
        )
        .listener(Arc::new(TracingListener))
        .build()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let execution = job.launch(&cancel).await?;

    println!(
        "Job finished: {} ({})",
        execution.status(),
        execution.exit_status()
    );
    for step in execution.step_executions() {
        println!(
            "  {}: read={} written={} skipped={}",
            step.step_name(),
            step.read_count(),
            step.write_count(),
            step.filter_count()
        );
    }

    Ok(())
}
