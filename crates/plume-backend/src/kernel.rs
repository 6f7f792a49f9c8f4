//! Kernel identifiers and their operand signatures.

use crate::backend::{BufferHandle, ElementFormat};
use crate::error::BackendError;
use glam::UVec3;

/// A named grid computation a backend knows how to dispatch.
///
/// Every kernel is one full pass over the output grid with one
/// independent unit of work per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Semi-Lagrangian advection tracing backwards along the velocity.
    AdvectForward,
    /// Semi-Lagrangian advection tracing forwards, used for error estimation.
    AdvectBackward,
    /// MacCormack correction with neighbourhood clamping.
    ///
    /// Inputs are velocity, the forward result, the backward result and
    /// the field before advection.
    MacCormack,
    /// Gaussian-falloff injection around a point.
    Impulse,
    /// Temperature/density driven vertical force.
    ///
    /// Inputs are velocity, temperature and density.
    Buoyancy,
    /// Curl of the velocity field.
    Vorticity,
    /// Vorticity confinement force.
    Confinement,
    /// Central-difference divergence of the velocity field.
    Divergence,
    /// One Jacobi relaxation of the pressure Poisson equation.
    Jacobi,
    /// Pressure gradient subtraction.
    SubtractGradient,
}

/// The uniform parameter blocks a kernel can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Grid dimensions and global simulation constants.
    General,
    /// Per-field advection constants.
    Advection,
    /// Impulse point, amount and radius.
    Impulse,
}

/// What element format an operand accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Exactly one scalar per cell.
    Scalar,
    /// Exactly one 3-vector per cell.
    Vector,
    /// Either format, but every `Quantity` operand of a dispatch must agree.
    Quantity,
}

impl Operand {
    fn accepts(self, format: ElementFormat) -> bool {
        match self {
            Operand::Scalar => format == ElementFormat::Scalar,
            Operand::Vector => format == ElementFormat::Vector3,
            Operand::Quantity => true,
        }
    }
}

impl Kernel {
    /// Every kernel, in pipeline order.
    pub const ALL: [Kernel; 10] = [
        Kernel::AdvectForward,
        Kernel::AdvectBackward,
        Kernel::MacCormack,
        Kernel::Impulse,
        Kernel::Buoyancy,
        Kernel::Vorticity,
        Kernel::Confinement,
        Kernel::Divergence,
        Kernel::Jacobi,
        Kernel::SubtractGradient,
    ];

    /// Stable name, also used as the shader entry point.
    pub fn name(self) -> &'static str {
        match self {
            Kernel::AdvectForward => "advect_forward",
            Kernel::AdvectBackward => "advect_backward",
            Kernel::MacCormack => "maccormack",
            Kernel::Impulse => "impulse",
            Kernel::Buoyancy => "buoyancy",
            Kernel::Vorticity => "vorticity",
            Kernel::Confinement => "confinement",
            Kernel::Divergence => "divergence",
            Kernel::Jacobi => "jacobi",
            Kernel::SubtractGradient => "subtract_gradient",
        }
    }

    /// Operand rules for the inputs, in binding order.
    pub fn inputs(self) -> &'static [Operand] {
        use Operand::*;
        match self {
            Kernel::AdvectForward | Kernel::AdvectBackward => &[Vector, Quantity],
            Kernel::MacCormack => &[Vector, Quantity, Quantity, Quantity],
            Kernel::Impulse => &[Quantity],
            Kernel::Buoyancy => &[Vector, Scalar, Scalar],
            Kernel::Vorticity => &[Vector],
            Kernel::Confinement => &[Vector, Vector],
            Kernel::Divergence => &[Vector],
            Kernel::Jacobi => &[Scalar, Scalar],
            Kernel::SubtractGradient => &[Vector, Scalar],
        }
    }

    /// Operand rule for the single output.
    pub fn output(self) -> Operand {
        match self {
            Kernel::AdvectForward
            | Kernel::AdvectBackward
            | Kernel::MacCormack
            | Kernel::Impulse => Operand::Quantity,
            Kernel::Buoyancy
            | Kernel::Vorticity
            | Kernel::Confinement
            | Kernel::SubtractGradient => Operand::Vector,
            Kernel::Divergence | Kernel::Jacobi => Operand::Scalar,
        }
    }

    /// Parameter blocks that must be uploaded before dispatch.
    pub fn params(self) -> &'static [ParamKind] {
        match self {
            Kernel::AdvectForward | Kernel::MacCormack => {
                &[ParamKind::General, ParamKind::Advection]
            }
            Kernel::Impulse => &[ParamKind::General, ParamKind::Impulse],
            _ => &[ParamKind::General],
        }
    }

    /// Checks a dispatch against this kernel's signature.
    ///
    /// `inputs` and `outputs` carry each buffer's handle, dimensions and
    /// format. Returns the shared grid dimensions and the quantity format
    /// (the output format) on success.
    pub fn validate(
        self,
        inputs: &[(BufferHandle, UVec3, ElementFormat)],
        outputs: &[(BufferHandle, UVec3, ElementFormat)],
    ) -> Result<(UVec3, ElementFormat), BackendError> {
        let rules = self.inputs();
        if inputs.len() != rules.len() || outputs.len() != 1 {
            return Err(BackendError::ArityMismatch {
                kernel: self,
                expected_inputs: rules.len(),
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }

        let (out_handle, dims, out_format) = outputs[0];
        if !self.output().accepts(out_format) {
            return Err(BackendError::FormatMismatch {
                kernel: self,
                operand: rules.len(),
            });
        }

        let mut quantity = (self.output() == Operand::Quantity).then_some(out_format);

        for (operand, (&(handle, buffer_dims, format), rule)) in
            inputs.iter().zip(rules.iter()).enumerate()
        {
            if handle == out_handle {
                return Err(BackendError::AliasedOutput {
                    kernel: self,
                    buffer: handle,
                });
            }
            if buffer_dims != dims {
                return Err(BackendError::DimensionMismatch {
                    kernel: self,
                    expected: dims,
                    found: buffer_dims,
                });
            }
            if !rule.accepts(format) {
                return Err(BackendError::FormatMismatch {
                    kernel: self,
                    operand,
                });
            }
            if *rule == Operand::Quantity {
                match quantity {
                    Some(expected) if expected != format => {
                        return Err(BackendError::FormatMismatch {
                            kernel: self,
                            operand,
                        });
                    }
                    _ => quantity = Some(format),
                }
            }
        }

        Ok((dims, out_format))
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(id: u32, format: ElementFormat) -> (BufferHandle, UVec3, ElementFormat) {
        (BufferHandle::new(id), UVec3::splat(4), format)
    }

    #[test]
    fn test_kernel_names_unique() {
        let mut names: Vec<_> = Kernel::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Kernel::ALL.len());
    }

    #[test]
    fn test_validate_advect_scalar() {
        let result = Kernel::AdvectForward.validate(
            &[buf(0, ElementFormat::Vector3), buf(1, ElementFormat::Scalar)],
            &[buf(2, ElementFormat::Scalar)],
        );
        let (dims, format) = result.unwrap();
        assert_eq!(dims, UVec3::splat(4));
        assert_eq!(format, ElementFormat::Scalar);
    }

    #[test]
    fn test_validate_quantity_mismatch() {
        let result = Kernel::AdvectForward.validate(
            &[buf(0, ElementFormat::Vector3), buf(1, ElementFormat::Scalar)],
            &[buf(2, ElementFormat::Vector3)],
        );
        assert!(matches!(
            result,
            Err(BackendError::FormatMismatch { operand: 1, .. })
        ));
    }

    #[test]
    fn test_validate_arity() {
        let result = Kernel::Jacobi.validate(
            &[buf(0, ElementFormat::Scalar)],
            &[buf(1, ElementFormat::Scalar)],
        );
        assert!(matches!(result, Err(BackendError::ArityMismatch { .. })));
    }

    #[test]
    fn test_validate_rejects_alias() {
        let result = Kernel::Jacobi.validate(
            &[buf(0, ElementFormat::Scalar), buf(1, ElementFormat::Scalar)],
            &[buf(0, ElementFormat::Scalar)],
        );
        assert!(matches!(result, Err(BackendError::AliasedOutput { .. })));
    }

    #[test]
    fn test_validate_dimension_mismatch() {
        let result = Kernel::Divergence.validate(
            &[(BufferHandle::new(0), UVec3::splat(8), ElementFormat::Vector3)],
            &[buf(1, ElementFormat::Scalar)],
        );
        assert!(matches!(result, Err(BackendError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_params_required() {
        assert!(Kernel::Impulse.params().contains(&ParamKind::Impulse));
        assert!(Kernel::AdvectForward.params().contains(&ParamKind::Advection));
        assert!(!Kernel::AdvectBackward.params().contains(&ParamKind::Advection));
        assert!(Kernel::ALL
            .iter()
            .all(|k| k.params().contains(&ParamKind::General)));
    }
}
