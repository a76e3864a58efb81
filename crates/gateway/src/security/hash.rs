use ianua_core::{Params, render};
use ianua_crypto::{DigestAlgorithm, HashChain, PostProcessStep, SigningError};
use tracing::debug;

use crate::config::HashOptions;

/// Signs the rendered template with a digest and post-processing chain.
#[derive(Debug, Clone)]
pub struct HashSigner {
    chain: HashChain,
}

impl HashSigner {
    pub fn new(chain: HashChain) -> Self {
        Self { chain }
    }

    pub fn from_options(options: &HashOptions) -> Result<Self, SigningError> {
        let digest: DigestAlgorithm = options.algorithm.parse()?;
        let steps = options
            .post_process
            .iter()
            .map(|step| PostProcessStep::from_config(&step.algorithm, step.private_key.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(HashChain::new(digest, steps)?))
    }

    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    pub fn sign(&self, template: &str, params: &Params) -> Result<String, SigningError> {
        let input = render(template, params);
        let signature = self.chain.sign(input.as_bytes())?;
        debug!(
            digest = %self.chain.digest_algorithm(),
            steps = self.chain.steps().len(),
            "computed hash signature"
        );
        Ok(signature)
    }
}
