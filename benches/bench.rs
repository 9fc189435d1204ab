use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trigon::{
    ring::{vec_from_f64, Angle, RingElement, Z2k},
    simulation::{run_in_process, share_among_workers},
    Decryptor, EncryptionParameters, Encryptor, Evaluator, FixedPointEncoder, HeConfig, HeContext,
    KeyGenerator,
};

type R = Z2k<62>;

fn he_benchmark(c: &mut Criterion, name: &str, poly_modulus_degree: usize, coeff_modulus_bits: Vec<usize>) {
    let config = HeConfig { poly_modulus_degree, coeff_modulus_bits, scale_bits: 50 };
    let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
    let keygen = KeyGenerator::new(context.clone());
    let encryptor = Encryptor::new(context.clone(), keygen.create_public_key());
    let decryptor = Decryptor::new(context.clone(), keygen.secret_key().clone());
    let evaluator = Evaluator::new(context.clone());
    let encoder = FixedPointEncoder::new(context.clone(), 20);

    let values: Vec<R> = (0..poly_modulus_degree).map(|i| R::from_f64(i as f64 / 16.0, 20)).collect();
    let level = context.max_level();
    let plain = encoder.encode(&values, level);
    let cipher1 = encryptor.encrypt(&plain);
    let cipher2 = encryptor.encrypt(&plain);

    let get_name = |op: &str| format!("{}/{}", name, op);
    c.bench_function(&get_name("Encode"), |b| b.iter(|| encoder.encode(black_box(&values), level)));
    c.bench_function(&get_name("Decode"), |b| b.iter(|| encoder.decode::<R>(black_box(&plain))));
    c.bench_function(&get_name("Encrypt"), |b| b.iter(|| encryptor.encrypt(black_box(&plain))));
    c.bench_function(&get_name("Decrypt"), |b| b.iter(|| decryptor.decrypt(black_box(&cipher1))));
    c.bench_function(&get_name("Add"), |b| b.iter(|| evaluator.add(black_box(&cipher1), &cipher2)));
}

fn criterion_he_benchmark(c: &mut Criterion) {
    he_benchmark(c, "HE/1024", 1024, vec![55, 55, 55]);
    he_benchmark(c, "HE/4096", 4096, vec![55, 55, 55, 55]);
}

fn criterion_mpc_benchmark(c: &mut Criterion) {
    for len in [16, 1024] {
        let a: Vec<R> = vec_from_f64(&(0..len).map(|i| i as f64 / 8.0).collect::<Vec<_>>(), 20);
        c.bench_function(&format!("MPC/MultElemVec/{}", len), |b| b.iter(|| {
            run_in_process(3, |mpc| {
                let x = share_among_workers(mpc.pid(), mpc.party_count(), &a, 1);
                mpc.ss_mult_elem_vec(&x, &x)
            }).unwrap()
        }));

        let angles: Vec<Angle> = vec_from_f64(&(0..len).map(|i| i as f64 * 0.01).collect::<Vec<_>>(), 0);
        c.bench_function(&format!("MPC/TrigVec/{}", len), |b| b.iter(|| {
            run_in_process(3, |mpc| {
                let x = share_among_workers(mpc.pid(), mpc.party_count(), &angles, 2);
                mpc.ss_trig_vec::<Angle, Z2k<64>>(&x)
            }).unwrap()
        }));

        c.bench_function(&format!("MPC/SigmoidVec/{}", len), |b| b.iter(|| {
            run_in_process(3, |mpc| {
                let x = share_among_workers(mpc.pid(), mpc.party_count(), &a, 3);
                mpc.ss_sigmoid_vec::<R, R>(&x)
            }).unwrap()
        }));
    }
}

criterion_group!(bench_he, criterion_he_benchmark);
criterion_group!(bench_mpc, criterion_mpc_benchmark);
criterion_main!(bench_he, bench_mpc);
