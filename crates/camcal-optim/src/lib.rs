//! Nonlinear refinement stages built on a generic least-squares backend.
//!
//! Every stage shares the same machinery: a flat parameter vector, a typed
//! pack/unpack layer ([`params`]), scalar per-observation reprojection
//! residuals, and a Levenberg-Marquardt backend ([`backend_lm`]).

pub mod backend_lm;
pub mod jacobian;
pub mod params;
pub mod problems;
pub mod traits;

pub use backend_lm::LmBackend;
pub use problems::bundle::{optimize_bundle, BundleProblem, BundleSolution};
pub use problems::distortion::{refine_distortion, DistortionRefineProblem};
pub use problems::extrinsics::{refine_pose, PoseRefineProblem};
pub use problems::homography::{refine_homography, HomographyRefineProblem};
pub use traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
