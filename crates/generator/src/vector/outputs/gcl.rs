//! Google Cloud Logging 출력 (`gcp_stackdriver_logs`)
//!
//! 서비스 계정 자격 증명은 시크릿의 `google-application-credentials.json`
//! 키를 마운트 경로로 참조합니다.

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::{keys, secret_path};
use crate::vector::elements::{Component, Remap};
use crate::vector::outputs::{
    DEDOT_LABELS, OutputContext, add_batch, add_buffer, add_retry, add_tls,
};

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let gcl = output.google_cloud_logging.clone().unwrap_or_default();
    let parents = gcl.parent_ids();
    let [(parent_key, parent_id)] = parents.as_slice() else {
        return Err(GeneratorError::invalid(
            &output.name,
            "exactly one of billingAccountId, organizationId, folderId or projectId must be set",
        ));
    };
    ctx.required_secret(keys::GOOGLE_APPLICATION_CREDENTIALS)?;
    let credentials = secret_path(
        output.secret_name().unwrap_or_default(),
        keys::GOOGLE_APPLICATION_CREDENTIALS,
    );

    let dedot_id = ctx.sub_id("dedot");
    let dedot = Remap::new(dedot_id.clone(), ctx.inputs.clone(), DEDOT_LABELS);

    let mut sink = Component::sink(&ctx.id, "gcp_stackdriver_logs", &[dedot_id]);
    sink.main()
        .string(parent_key, parent_id)
        .string("credentials_path", &credentials)
        .string("log_id", &gcl.log_id)
        .string("severity_key", "level");
    sink.table("resource")
        .string("type", "k8s_node")
        .string("node_name", "{{hostname}}");
    add_buffer(&mut sink, output);
    add_retry(&mut sink, output)?;
    add_batch(&mut sink, output)?;
    add_tls(&mut sink, ctx, false)?;

    Ok(vec![Box::new(dedot), Box::new(sink)])
}
