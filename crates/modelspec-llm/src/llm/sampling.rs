use llama_cpp_2::sampling::LlamaSampler;
use modelspec_core::config::SamplingConfig;

/// How the next token is picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Highest-probability token.
    Greedy,
    /// Temperature → top-p → seeded distribution.
    Stochastic { temperature: f32, top_p: f32, seed: u32 },
}

impl Strategy {
    /// A missing or non-positive temperature selects greedy decoding.
    pub fn from_config(cfg: &SamplingConfig) -> Self {
        match cfg.temperature {
            Some(temperature) if temperature > 0.0 => Self::Stochastic {
                temperature,
                top_p: cfg.top_p,
                seed: cfg.seed,
            },
            _ => Self::Greedy,
        }
    }

    pub fn sampler(&self) -> LlamaSampler {
        match *self {
            Self::Greedy => LlamaSampler::greedy(),
            Self::Stochastic {
                temperature,
                top_p,
                seed,
            } => LlamaSampler::chain_simple([
                LlamaSampler::temp(temperature),
                LlamaSampler::top_p(top_p, 1),
                LlamaSampler::dist(seed),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_greedy() {
        assert_eq!(
            Strategy::from_config(&SamplingConfig::default()),
            Strategy::Greedy
        );
    }

    #[test]
    fn zero_temperature_is_greedy() {
        let cfg = SamplingConfig {
            temperature: Some(0.0),
            ..Default::default()
        };
        assert_eq!(Strategy::from_config(&cfg), Strategy::Greedy);
    }

    #[test]
    fn temperature_enables_stochastic_chain() {
        let cfg = SamplingConfig {
            temperature: Some(0.7),
            top_p: 0.95,
            seed: 7,
        };
        assert_eq!(
            Strategy::from_config(&cfg),
            Strategy::Stochastic {
                temperature: 0.7,
                top_p: 0.95,
                seed: 7
            }
        );
    }
}
