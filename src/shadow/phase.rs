//! Frame phases of the shadow map.
//!
//! The depth texture is either a render target or a sampled texture, never
//! both. Every use goes through [`ShadowPhase::advance`], which rejects any
//! order that would bind the map for sampling while it is being written, or
//! write it while a lighting pass still has it bound.
//!
//! ```text
//! Uninitialized -> Configured -> Cleared -> Rendered -> Sampling -> Unbound
//!                                   ^                                  |
//!                                   +----------------------------------+
//! ```
//!
//! Reconfiguring (new resolution or bias) returns to `Configured` from any
//! phase except `Sampling`.

use crate::error::ShadowStateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowPhase {
    /// No depth texture exists yet.
    #[default]
    Uninitialized,
    /// Resources exist but have not been written this frame.
    Configured,
    /// Bound as depth attachment and cleared to 1.0.
    Cleared,
    /// Depth written; ready to be bound for sampling.
    Rendered,
    /// Bound to the lighting pass as a comparison texture.
    Sampling,
    /// Released by the lighting pass; may be cleared again.
    Unbound,
}

impl ShadowPhase {
    /// Returns true if moving from `self` to `next` is a legal step.
    pub fn can_advance_to(self, next: ShadowPhase) -> bool {
        use ShadowPhase::*;
        match next {
            Uninitialized => false,
            Configured => self != Sampling,
            // A frame may skip sampling (shadows toggled off mid-frame), so a
            // rendered map can be cleared again.
            Cleared => matches!(self, Configured | Rendered | Unbound),
            Rendered => self == Cleared,
            Sampling => self == Rendered,
            Unbound => self == Sampling,
        }
    }

    /// Moves to `next`, or reports the rejected transition and stays put.
    pub fn advance(&mut self, next: ShadowPhase) -> Result<(), ShadowStateError> {
        if self.can_advance_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(ShadowStateError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// The depth texture is currently bound for sampling.
    pub fn is_sampling(self) -> bool {
        self == ShadowPhase::Sampling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ShadowPhase::*;

    fn walk(steps: &[ShadowPhase]) -> Result<ShadowPhase, ShadowStateError> {
        let mut phase = Uninitialized;
        for &step in steps {
            phase.advance(step)?;
        }
        Ok(phase)
    }

    #[test]
    fn full_frame_cycle() {
        let phase = walk(&[
            Configured, Cleared, Rendered, Sampling, Unbound, Cleared, Rendered, Sampling,
            Unbound,
        ])
        .unwrap();
        assert_eq!(phase, Unbound);
    }

    #[test]
    fn cannot_write_while_sampling() {
        let err = walk(&[Configured, Cleared, Rendered, Sampling, Cleared]).unwrap_err();
        assert_eq!(
            err,
            ShadowStateError::InvalidTransition {
                from: Sampling,
                to: Cleared
            }
        );
    }

    #[test]
    fn cannot_sample_before_render() {
        assert!(walk(&[Configured, Sampling]).is_err());
        assert!(walk(&[Configured, Cleared, Sampling]).is_err());
    }

    #[test]
    fn cannot_render_without_resources() {
        assert!(walk(&[Cleared]).is_err());
    }

    #[test]
    fn reconfigure_allowed_except_while_sampling() {
        for path in [
            &[Configured][..],
            &[Configured, Cleared],
            &[Configured, Cleared, Rendered],
            &[Configured, Cleared, Rendered, Sampling, Unbound],
        ] {
            let mut phase = walk(path).unwrap();
            assert!(phase.advance(Configured).is_ok(), "from {path:?}");
        }

        let mut phase = walk(&[Configured, Cleared, Rendered, Sampling]).unwrap();
        assert!(phase.advance(Configured).is_err());
        assert!(phase.is_sampling());
    }

    #[test]
    fn failed_advance_keeps_phase() {
        let mut phase = Configured;
        assert!(phase.advance(Unbound).is_err());
        assert_eq!(phase, Configured);
    }
}
