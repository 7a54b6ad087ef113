#![forbid(unsafe_code)]

//! samlkit CLI: encrypt and decrypt SAML identifiers, sign and verify
//! assertions, and canonicalize documents.

use clap::{Parser, Subcommand};
use samlkit_core::{algorithm, Error};
use samlkit_dsig::{DsigContext, VerifyResult};
use samlkit_enc::EncContext;
use samlkit_keys::{loader, AlgorithmFactory, EncryptionHandle, Key, SignatureHandle};
use samlkit_saml::{
    container, set_container, Assertion, DefaultContainer, Encryptable, EncryptedId,
    IdentifierValue, Signable,
};
use samlkit_xml::{Node, Serializable, XmlElement};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "samlkit",
    about = "samlkit: SAML 2.0 identifiers and assertions with XML-Enc and XML-DSig",
    version
)]
struct Cli {
    /// Log engine steps (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Allow an algorithm that is blacklisted by default (URI)
    #[arg(long = "allow", global = true)]
    allow: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a NameID, Issuer or BaseID into a saml:EncryptedID
    EncryptId {
        /// Input XML file holding the identifier element
        file: PathBuf,

        /// Recipient public key (PEM)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Raw AES key file for key wrapping
        #[arg(long = "kek")]
        kek: Option<PathBuf>,

        /// Key transport algorithm URI
        #[arg(long = "key-alg", default_value = algorithm::RSA_OAEP)]
        key_alg: String,

        /// Data encryption algorithm URI
        #[arg(long = "data-alg", default_value = algorithm::AES256_GCM)]
        data_alg: String,

        /// Place the EncryptedKey after EncryptedData (DATA_ID:KEY_ID)
        #[arg(long)]
        detached: Option<String>,

        /// Recipient attribute for the EncryptedKey
        #[arg(long)]
        recipient: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a saml:EncryptedID and print the identifier
    DecryptId {
        /// Input XML file holding the EncryptedID element
        file: PathBuf,

        /// Private key (PEM)
        #[arg(short = 'k', long)]
        key: Option<PathBuf>,

        /// Raw AES key file: a key-wrap KEK, or the session key itself
        /// when the envelope carries no EncryptedKey
        #[arg(long = "aes-key")]
        aes_key: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign a saml:Assertion
    Sign {
        /// Input XML file holding the assertion
        file: PathBuf,

        /// Private key (PEM)
        #[arg(short = 'k', long)]
        key: Option<PathBuf>,

        /// Raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,

        /// Signature algorithm URI
        #[arg(long, default_value = algorithm::RSA_SHA256)]
        alg: String,

        /// Digest algorithm URI for the reference
        #[arg(long)]
        digest: Option<String>,

        /// KeyName to place in ds:KeyInfo
        #[arg(long = "key-name")]
        key_name: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a signed saml:Assertion
    Verify {
        /// Input XML file holding the assertion
        file: PathBuf,

        /// Public or private key (PEM)
        #[arg(short = 'k', long)]
        key: Option<PathBuf>,

        /// Raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,
    },

    /// Print the canonical form of a document
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let blacklist: Vec<String> = algorithm::DEFAULT_BLACKLIST
        .iter()
        .filter(|uri| !cli.allow.iter().any(|a| a == *uri))
        .map(|uri| uri.to_string())
        .collect();
    set_container(Arc::new(DefaultContainer::new().with_blacklist(blacklist.clone())));
    let factory = AlgorithmFactory::new(blacklist);

    let result = match cli.command {
        Commands::EncryptId {
            file,
            cert,
            kek,
            key_alg,
            data_alg,
            detached,
            recipient,
            output,
        } => cmd_encrypt_id(
            &factory, file, cert, kek, key_alg, data_alg, detached, recipient, output,
        ),

        Commands::DecryptId {
            file,
            key,
            aes_key,
            output,
        } => cmd_decrypt_id(&factory, file, key, aes_key, output),

        Commands::Sign {
            file,
            key,
            hmac_key,
            alg,
            digest,
            key_name,
            output,
        } => cmd_sign(&factory, file, key, hmac_key, alg, digest, key_name, output),

        Commands::Verify {
            file,
            key,
            hmac_key,
        } => cmd_verify(&factory, file, key, hmac_key),

        Commands::C14n { file, output } => cmd_c14n(file, output),

        Commands::Info => cmd_info(&factory),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn cmd_encrypt_id(
    factory: &AlgorithmFactory,
    file: PathBuf,
    cert: Option<PathBuf>,
    kek: Option<PathBuf>,
    key_alg: String,
    data_alg: String,
    detached: Option<String>,
    recipient: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let node = read_xml(&file)?;
    let identifier = IdentifierValue::resolve(&node, container().as_ref())?;

    let key = match (cert, kek) {
        (Some(path), None) => loader::load_key_file(&path)?,
        (None, Some(path)) => loader::load_aes_key(&read_bytes(&path)?)?,
        _ => return Err(Error::Other("pass exactly one of --cert or --kek".into())),
    };
    let handle = factory.key_transport(&key_alg, key)?;

    let mut ctx = EncContext::new()
        .with_data_algorithm(data_alg)
        .with_blacklist(factory.blacklist().to_vec());
    if let Some(ids) = detached {
        let (data_id, key_id) = ids
            .split_once(':')
            .ok_or_else(|| Error::Other(format!("invalid --detached {ids} (expected DATA_ID:KEY_ID)")))?;
        ctx = ctx.detached(data_id, key_id);
    }
    ctx.recipient = recipient;

    tracing::debug!(identifier = %node.clark(), "encrypting identifier");
    let encrypted = EncryptedId::new(identifier.encrypt_with(handle.as_ref(), &ctx)?);
    write_output(output, &samlkit_c14n::render(&encrypted.to_node()))
}

fn cmd_decrypt_id(
    factory: &AlgorithmFactory,
    file: PathBuf,
    key: Option<PathBuf>,
    aes_key: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let encrypted = EncryptedId::from_node(&read_xml(&file)?)?;
    let envelope = &encrypted.envelope;

    let mut transport = envelope.data.inline_keys()?;
    transport.extend(envelope.keys.iter().cloned());
    let key_alg = transport
        .iter()
        .find_map(|k| k.encryption_method.as_ref())
        .map(|m| m.algorithm.clone());

    let handle: Box<dyn EncryptionHandle> = match (key, aes_key, key_alg) {
        (Some(path), None, Some(uri)) => factory.key_transport(&uri, loader::load_key_file(&path)?)?,
        (None, Some(path), Some(uri)) => {
            factory.key_transport(&uri, loader::load_aes_key(&read_bytes(&path)?)?)?
        }
        (None, Some(path), None) => {
            let uri = envelope
                .data
                .algorithm()
                .ok_or_else(|| Error::Other("EncryptedData has no EncryptionMethod".into()))?;
            factory.block_cipher(uri, &read_bytes(&path)?)?
        }
        (Some(_), None, None) => {
            return Err(Error::Other(
                "no EncryptedKey in the envelope; pass the session key with --aes-key".into(),
            ))
        }
        _ => return Err(Error::Other("pass exactly one of --key or --aes-key".into())),
    };

    let identifier = encrypted.decrypt(handle.as_ref())?;
    write_output(output, &samlkit_c14n::render(&identifier.to_node()))
}

#[allow(clippy::too_many_arguments)]
fn cmd_sign(
    factory: &AlgorithmFactory,
    file: PathBuf,
    key: Option<PathBuf>,
    hmac_key: Option<PathBuf>,
    alg: String,
    digest: Option<String>,
    key_name: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut assertion = Assertion::from_node(&read_xml(&file)?)?;
    let handle = signature_handle(factory, &alg, key, hmac_key)?;

    let mut ctx = DsigContext::new().with_blacklist(factory.blacklist().to_vec());
    if let Some(uri) = digest {
        ctx = ctx.with_digest_method(uri);
    }
    if let Some(name) = key_name {
        ctx = ctx.with_key_name(name);
    }

    tracing::debug!(id = assertion.id(), "signing assertion");
    assertion.sign_with(handle.as_ref(), &ctx)?;
    write_output(output, &samlkit_c14n::render(&assertion.to_node()))
}

fn cmd_verify(
    factory: &AlgorithmFactory,
    file: PathBuf,
    key: Option<PathBuf>,
    hmac_key: Option<PathBuf>,
) -> Result<(), Error> {
    let assertion = Assertion::from_node(&read_xml(&file)?)?;
    let alg = assertion
        .signature()
        .map(|s| s.algorithm().to_owned())
        .ok_or_else(|| Error::Other(format!("{}: assertion is not signed", file.display())))?;
    let handle = signature_handle(factory, &alg, key, hmac_key)?;

    match assertion.verify(handle.as_ref())? {
        VerifyResult::Valid => {
            println!("OK");
            Ok(())
        }
        VerifyResult::Invalid { reason } => {
            eprintln!("INVALID: {reason}");
            process::exit(1);
        }
    }
}

fn cmd_c14n(file: PathBuf, output: Option<PathBuf>) -> Result<(), Error> {
    let node = read_xml(&file)?;
    write_output(output, &samlkit_c14n::render(&node))
}

fn cmd_info(factory: &AlgorithmFactory) -> Result<(), Error> {
    let sections: [(&str, &[&str]); 5] = [
        (
            "Data encryption",
            &[
                algorithm::AES128_CBC,
                algorithm::AES192_CBC,
                algorithm::AES256_CBC,
                algorithm::AES128_GCM,
                algorithm::AES192_GCM,
                algorithm::AES256_GCM,
                algorithm::TRIPLEDES_CBC,
            ],
        ),
        (
            "Key transport",
            &[
                algorithm::RSA_PKCS1,
                algorithm::RSA_OAEP,
                algorithm::RSA_OAEP_ENC11,
                algorithm::KW_AES128,
                algorithm::KW_AES192,
                algorithm::KW_AES256,
            ],
        ),
        (
            "Signature",
            &[
                algorithm::RSA_SHA1,
                algorithm::RSA_SHA256,
                algorithm::RSA_SHA384,
                algorithm::RSA_SHA512,
                algorithm::ECDSA_SHA256,
                algorithm::HMAC_SHA1,
                algorithm::HMAC_SHA256,
                algorithm::HMAC_SHA384,
                algorithm::HMAC_SHA512,
            ],
        ),
        (
            "Digest",
            &[
                algorithm::SHA1,
                algorithm::SHA224,
                algorithm::SHA256,
                algorithm::SHA384,
                algorithm::SHA512,
            ],
        ),
        ("Canonicalization", &[algorithm::EXC_C14N]),
    ];

    println!("samlkit: SAML 2.0 with XML-Enc and XML-DSig");
    for (title, uris) in sections {
        println!();
        println!("{title}:");
        for uri in uris {
            let marker = if factory.check(uri).is_err() {
                " (blacklisted)"
            } else {
                ""
            };
            println!("  {uri}{marker}");
        }
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn signature_handle(
    factory: &AlgorithmFactory,
    alg: &str,
    key: Option<PathBuf>,
    hmac_key: Option<PathBuf>,
) -> Result<Box<dyn SignatureHandle>, Error> {
    let key: Key = match (key, hmac_key) {
        (Some(path), None) => loader::load_key_file(&path)?,
        (None, Some(path)) => loader::load_hmac_key(&read_bytes(&path)?),
        _ => return Err(Error::Other("pass exactly one of --key or --hmac-key".into())),
    };
    factory.signature(alg, key)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn read_xml(path: &Path) -> Result<Node, Error> {
    samlkit_xml::parse(&read_bytes(path)?)
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display())))
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
