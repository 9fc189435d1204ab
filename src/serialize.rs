use std::io::{Read, Write, Result, Error, ErrorKind};

use crate::{
    Plaintext,
    Ciphertext,
    HeContext,
    ParmsID,
    text::CIPHERTEXT_SIZE,
};

/// Provide serialization and deserialization methods for
/// HE objects relative to an HE context.
pub trait SerializableWithHeContext {
    /// Serialize the object into a stream.
    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize>;
    /// Deserialize the object from a stream.
    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Self> where Self: Sized;
    /// Get the size (bytes) of the object if serialized.
    fn serialized_size(&self, context: &HeContext) -> usize;
}

fn invalid_data(message: &str) -> Error {
    Error::new(ErrorKind::InvalidData, message.to_string())
}

/// Bytes needed for a residue modulo a prime of `modulus` value.
#[inline]
fn get_u64_limit(modulus: u64) -> usize {
    let bits = 64 - modulus.leading_zeros() as usize;
    (bits + 7) / 8
}

#[inline]
fn write_u64_limited<T: Write>(stream: &mut T, value: u64, limit: usize) -> Result<usize> {
    stream.write_all(&value.to_le_bytes()[..limit])?;
    Ok(limit)
}

#[inline]
fn read_u64_limited<T: Read>(stream: &mut T, limit: usize) -> Result<u64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf[..limit])?;
    Ok(u64::from_le_bytes(buf))
}

fn serialize_parms_id<T: Write>(parms_id: &ParmsID, stream: &mut T) -> Result<usize> {
    for word in parms_id {
        stream.write_all(&word.to_le_bytes())?;
    }
    Ok(32)
}

fn deserialize_parms_id<T: Read>(stream: &mut T) -> Result<ParmsID> {
    let mut parms_id = [0u64; 4];
    for word in parms_id.iter_mut() {
        let mut buf = [0u8; 8];
        stream.read_exact(&mut buf)?;
        *word = u64::from_le_bytes(buf);
    }
    Ok(parms_id)
}

/// Serializer of bare RNS polynomials, tagged with the [ParmsID] of their level.
pub struct PolynomialSerializer {}

impl PolynomialSerializer {

    /// Serialize a polynomial.
    pub fn serialize_polynomial<T: Write>(context: &HeContext, stream: &mut T, data: &[u64], parms_id: ParmsID) -> Result<usize> {
        let level = context.level_of(&parms_id)
            .ok_or_else(|| invalid_data("Unknown parms id"))?;
        let context_data = context.context_data(level);
        if data.len() != context_data.poly_len() {
            return Err(invalid_data("Polynomial length does not match its level"));
        }
        let poly_degree = context_data.poly_modulus_degree();
        let mut bytes_written = serialize_parms_id(&parms_id, stream)?;
        for (j, modulus) in context_data.coeff_modulus().iter().enumerate() {
            let limit = get_u64_limit(modulus.value());
            for k in &data[j * poly_degree..(j + 1) * poly_degree] {
                bytes_written += write_u64_limited(stream, *k, limit)?;
            }
        }
        Ok(bytes_written)
    }

    /// Deserialize a polynomial, returning its words and level.
    pub fn deserialize_polynomial<T: Read>(context: &HeContext, stream: &mut T) -> Result<(Vec<u64>, usize)> {
        let parms_id = deserialize_parms_id(stream)?;
        let level = context.level_of(&parms_id)
            .ok_or_else(|| invalid_data("Unknown parms id"))?;
        let context_data = context.context_data(level);
        let poly_degree = context_data.poly_modulus_degree();
        let mut data = Vec::with_capacity(context_data.poly_len());
        for modulus in context_data.coeff_modulus() {
            let limit = get_u64_limit(modulus.value());
            for _ in 0..poly_degree {
                let value = read_u64_limited(stream, limit)?;
                if value >= modulus.value() {
                    return Err(invalid_data("Coefficient out of range"));
                }
                data.push(value);
            }
        }
        Ok((data, level))
    }

    /// Size in bytes if [PolynomialSerializer::serialize_polynomial] is called.
    pub fn serialized_polynomial_size(context: &HeContext, level: usize) -> usize {
        let context_data = context.context_data(level);
        let degree = context_data.poly_modulus_degree();
        32 + context_data.coeff_modulus().iter()
            .map(|m| degree * get_u64_limit(m.value()))
            .sum::<usize>()
    }

}

impl SerializableWithHeContext for Plaintext {
    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize> {
        PolynomialSerializer::serialize_polynomial(context, stream, self.data(), *self.parms_id())
    }

    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Self> {
        let (data, level) = PolynomialSerializer::deserialize_polynomial(context, stream)?;
        let mut plain = Plaintext::zeros(context, level);
        plain.data_mut().copy_from_slice(&data);
        Ok(plain)
    }

    fn serialized_size(&self, context: &HeContext) -> usize {
        PolynomialSerializer::serialized_polynomial_size(context, self.level())
    }
}

impl SerializableWithHeContext for Ciphertext {
    fn serialize<T: Write>(&self, context: &HeContext, stream: &mut T) -> Result<usize> {
        let mut bytes_written = 0;
        for id in 0..CIPHERTEXT_SIZE {
            bytes_written += PolynomialSerializer::serialize_polynomial(context, stream, self.poly(id), *self.parms_id())?;
        }
        Ok(bytes_written)
    }

    fn deserialize<T: Read>(context: &HeContext, stream: &mut T) -> Result<Self> {
        let (c0, level) = PolynomialSerializer::deserialize_polynomial(context, stream)?;
        let (c1, level1) = PolynomialSerializer::deserialize_polynomial(context, stream)?;
        if level != level1 {
            return Err(invalid_data("Ciphertext polynomials at different levels"));
        }
        let mut cipher = Ciphertext::zeros(context, level);
        cipher.poly_mut(0).copy_from_slice(&c0);
        cipher.poly_mut(1).copy_from_slice(&c1);
        Ok(cipher)
    }

    fn serialized_size(&self, context: &HeContext) -> usize {
        CIPHERTEXT_SIZE * PolynomialSerializer::serialized_polynomial_size(context, self.level())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        config::HeConfig, util::{rlwe, BlakeRNG, PRNGSeed}, EncryptionParameters,
    };

    #[test]
    fn test_ciphertext_serialization() {
        let config = HeConfig { poly_modulus_degree: 64, coeff_modulus_bits: vec![40, 30], scale_bits: 20 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let mut rng = BlakeRNG::from_seed(PRNGSeed([4; 64]));
        let mut cipher = Ciphertext::zeros(&context, 1);
        let moduli = context.context_data(1).coeff_modulus().to_vec();
        let (c0, c1) = cipher.polys_mut();
        rlwe::sample::uniform(&mut rng, 64, &moduli, c0);
        rlwe::sample::uniform(&mut rng, 64, &moduli, c1);

        let mut bytes = vec![];
        let written = cipher.serialize(&context, &mut bytes).unwrap();
        assert_eq!(written, bytes.len());
        assert_eq!(written, cipher.serialized_size(&context));
        // 40-bit and 30-bit primes take 5 and 4 bytes per coefficient
        assert_eq!(written, 2 * (32 + 64 * 5 + 64 * 4));
        let decoded = Ciphertext::deserialize(&context, &mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, cipher);
    }

    #[test]
    fn test_unknown_parms_id_rejected() {
        let config = HeConfig { poly_modulus_degree: 16, coeff_modulus_bits: vec![30], scale_bits: 20 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let bytes = vec![0xabu8; 32 + 16 * 4];
        let err = Plaintext::deserialize(&context, &mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
