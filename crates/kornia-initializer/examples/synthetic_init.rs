use argh::FromArgs;
use glam::{DMat3, DVec2, DVec3};
use kornia_initializer::{Initializer, InitializerConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(FromArgs)]
/// Initialize a map from two synthetic views.
struct Args {
    /// number of 3D points in the scene
    #[argh(option, short = 'n', default = "300")]
    num_points: usize,

    /// fraction of matches replaced by random pixels
    #[argh(option, default = "0.2")]
    outlier_ratio: f64,

    /// standard deviation of the keypoint noise, in pixels
    #[argh(option, default = "0.5")]
    noise: f64,

    /// put every point on a single plane
    #[argh(switch)]
    planar: bool,

    /// random seed for the scene and for RANSAC
    #[argh(option, default = "0")]
    seed: u64,
}

fn project(k: &DMat3, x: DVec3) -> DVec2 {
    let p = *k * x;
    DVec2::new(p.x / p.z, p.y / p.z)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let k = DMat3::from_cols(
        DVec3::new(500.0, 0.0, 0.0),
        DVec3::new(0.0, 500.0, 0.0),
        DVec3::new(320.0, 240.0, 1.0),
    );
    let rotation = DMat3::from_rotation_y(0.06) * DMat3::from_rotation_x(-0.02);
    let translation = DVec3::new(-0.5, 0.02, 0.0);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut reference = Vec::with_capacity(args.num_points);
    let mut current = Vec::with_capacity(args.num_points);
    for _ in 0..args.num_points {
        let x: f64 = rng.random_range(-2.0..2.0);
        let y: f64 = rng.random_range(-1.5..1.5);
        let z = if args.planar {
            5.0 + 0.2 * x
        } else {
            rng.random_range(4.0..8.0)
        };
        let p = DVec3::new(x, y, z);

        let jitter = |rng: &mut StdRng| {
            DVec2::new(
                rng.random_range(-args.noise..=args.noise),
                rng.random_range(-args.noise..=args.noise),
            )
        };
        reference.push(project(&k, p) + jitter(&mut rng));
        let kp2 = if rng.random_bool(args.outlier_ratio.clamp(0.0, 1.0)) {
            DVec2::new(rng.random_range(0.0..640.0), rng.random_range(0.0..480.0))
        } else {
            project(&k, rotation * p + translation) + jitter(&mut rng)
        };
        current.push(kp2);
    }
    let matches: Vec<Option<usize>> = (0..args.num_points).map(Some).collect();

    let config = InitializerConfig {
        random_seed: Some(args.seed),
        ..Default::default()
    };
    let initializer = Initializer::new(reference, k, config)?;
    let init = initializer.initialize(&current, &matches)?;

    println!("model: {:?}", init.model);
    println!("R: {:?}", init.rotation);
    println!("t: {:?}", init.translation);
    println!("t (true, normalized): {:?}", translation.normalize());
    println!(
        "triangulated: {} / {}, parallax: {:.2} deg",
        init.num_triangulated, args.num_points, init.parallax_deg
    );
    println!("score: {:.3}", init.score);

    Ok(())
}
