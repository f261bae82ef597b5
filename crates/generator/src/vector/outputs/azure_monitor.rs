//! Azure Monitor Logs 출력

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::keys;
use crate::vector::elements::Component;
use crate::vector::outputs::{OutputContext, add_buffer, add_batch, add_retry, add_tls};

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let azure = output.azure_monitor.clone().unwrap_or_default();
    let shared_key = ctx.required_secret(keys::SHARED_KEY)?;

    let mut sink = Component::sink(&ctx.id, "azure_monitor_logs", &ctx.inputs);
    sink.main()
        .string("customer_id", &azure.customer_id)
        .string("log_type", &azure.log_type)
        .string("shared_key", &shared_key)
        .opt_string("azure_resource_id", azure.azure_resource_id.as_deref())
        .opt_string("host", azure.host.as_deref().filter(|h| !h.is_empty()));
    add_buffer(&mut sink, output);
    add_retry(&mut sink, output)?;
    add_batch(&mut sink, output)?;
    add_tls(&mut sink, ctx, false)?;

    Ok(vec![Box::new(sink)])
}
