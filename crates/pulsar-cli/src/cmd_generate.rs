use pulsar_codegen::pipeline::PipelineMode;

use crate::CommonOpts;
use crate::cmd_helpers::run_pipeline;

pub(crate) fn run(opts: CommonOpts) -> anyhow::Result<()> {
    run_pipeline(&opts, PipelineMode::Sources)
}
