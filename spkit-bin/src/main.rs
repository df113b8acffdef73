// Copyright 2025 spkit developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Note that clippy attributes should be in sync with those declared in
// "src/lib.rs"
#![warn(clippy::all, clippy::nursery, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::too_many_lines
)]
// Some from restriction lint-group
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::create_dir,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::impl_trait_in_params,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::multiple_inherent_impl,
    clippy::print_stdout,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::try_err,
    clippy::unnecessary_self_imports,
    clippy::wildcard_enum_match_arm
)]

use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;

use spkit::cepstrum::CepstrumToNdps;
use spkit::cepstrum::CepstrumToNdpsBuffer;
use spkit::cepstrum::LpcToCepstrum;
use spkit::config::GmmConfig;
use spkit::config::GmmInitialization;
use spkit::config::LbgConfig;
use spkit::distance::Metric;
use spkit::dtw::DynamicTimeWarping;
use spkit::dtw::LocalPathConstraint;
use spkit::entropy::EntropyCalculator;
use spkit::entropy::EntropyUnit;
use spkit::filterbank::MelFilterBank;
use spkit::filterbank::MelFilterBankConfig;
use spkit::frame_stats;
use spkit::gmm::GaussianMixtureModeling;
use spkit::gmm::GmmParameters;
use spkit::histogram::HistogramCalculator;
use spkit::levinson::LevinsonDurbin;
use spkit::levinson::LevinsonDurbinBuffer;
use spkit::levinson::ReverseLevinsonDurbin;
use spkit::levinson::ReverseLevinsonDurbinBuffer;
use spkit::levinson::WaveformToAutocorrelation;
use spkit::matrix::SymmetricMatrix;
use spkit::mfcc::MfccAnalysis;
use spkit::mfcc::MfccAnalysisBuffer;
use spkit::mlpg::MaximumLikelihoodParameterGeneration;
use spkit::pca::PcaBuffer;
use spkit::pca::PrincipalComponentAnalysis;
use spkit::plp::PlpAnalysis;
use spkit::plp::PlpAnalysisBuffer;
use spkit::spectral::SpectrumFormat;
use spkit::spectral::SpectrumToSpectrum;
use spkit::vc::GmmBasedConversion;
use spkit::vq::LindeBuzoGray;
use spkit::vq::MultistageVectorQuantization;
use spkit::vq::MultistageVectorQuantizationBuffer;
use spkit::vq::VectorQuantization;

mod stream;

/// Speech-signal-processing stream tools.
///
/// All data I/O is raw little-endian f64 unless noted otherwise.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Waveform frames to autocorrelation.
    Acorr(AcorrArgs),
    /// Autocorrelation to gain and LPC via Levinson-Durbin.
    Levdur(LevdurArgs),
    /// Gain and LPC back to autocorrelation.
    Rlevdur(RlevdurArgs),
    /// LPC to cepstrum.
    Lpc2c(Lpc2cArgs),
    /// Cepstrum to negative derivative of phase spectrum.
    C2ndps(C2ndpsArgs),
    /// Spectrum format conversion.
    Spec2spec(Spec2specArgs),
    /// Mel filter bank output of power spectrum frames.
    Fbank(FbankArgs),
    /// Mel frequency cepstral coefficients.
    Mfcc(MfccArgs),
    /// Perceptual linear predictive coefficients.
    Plp(PlpArgs),
    /// Nearest-codeword vector quantization.
    Vq(VqArgs),
    /// Multistage residual vector quantization.
    Msvq(MsvqArgs),
    /// Linde-Buzo-Gray codebook design.
    Lbg(LbgArgs),
    /// Dynamic time warping alignment.
    Dtw(DtwArgs),
    /// Gaussian mixture model training.
    Gmm(GmmArgs),
    /// Maximum likelihood parameter generation.
    Mlpg(MlpgArgs),
    /// GMM-based voice conversion.
    Vc(VcArgs),
    /// Principal component analysis.
    Pca(PcaArgs),
    /// Histogram over equal-width bins.
    Histogram(HistogramArgs),
    /// Entropy of probability frames.
    Entropy(EntropyArgs),
    /// Stream or framed average.
    Average(AverageArgs),
    /// Element-wise vector summation.
    Vsum(VsumArgs),
    /// Root mean squared error of two streams.
    Rmse(RmseArgs),
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Acorr(_) => "acorr",
            Self::Levdur(_) => "levdur",
            Self::Rlevdur(_) => "rlevdur",
            Self::Lpc2c(_) => "lpc2c",
            Self::C2ndps(_) => "c2ndps",
            Self::Spec2spec(_) => "spec2spec",
            Self::Fbank(_) => "fbank",
            Self::Mfcc(_) => "mfcc",
            Self::Plp(_) => "plp",
            Self::Vq(_) => "vq",
            Self::Msvq(_) => "msvq",
            Self::Lbg(_) => "lbg",
            Self::Dtw(_) => "dtw",
            Self::Gmm(_) => "gmm",
            Self::Mlpg(_) => "mlpg",
            Self::Vc(_) => "vc",
            Self::Pca(_) => "pca",
            Self::Histogram(_) => "histogram",
            Self::Entropy(_) => "entropy",
            Self::Average(_) => "average",
            Self::Vsum(_) => "vsum",
            Self::Rmse(_) => "rmse",
        }
    }

    fn execute(self) -> Result<(), String> {
        match self {
            Self::Acorr(args) => cmd_acorr(&args),
            Self::Levdur(args) => cmd_levdur(&args),
            Self::Rlevdur(args) => cmd_rlevdur(&args),
            Self::Lpc2c(args) => cmd_lpc2c(&args),
            Self::C2ndps(args) => cmd_c2ndps(&args),
            Self::Spec2spec(args) => cmd_spec2spec(&args),
            Self::Fbank(args) => cmd_fbank(&args),
            Self::Mfcc(args) => cmd_mfcc(&args),
            Self::Plp(args) => cmd_plp(&args),
            Self::Vq(args) => cmd_vq(&args),
            Self::Msvq(args) => cmd_msvq(&args),
            Self::Lbg(args) => cmd_lbg(&args),
            Self::Dtw(args) => cmd_dtw(&args),
            Self::Gmm(args) => cmd_gmm(&args),
            Self::Mlpg(args) => cmd_mlpg(&args),
            Self::Vc(args) => cmd_vc(&args),
            Self::Pca(args) => cmd_pca(&args),
            Self::Histogram(args) => cmd_histogram(&args),
            Self::Entropy(args) => cmd_entropy(&args),
            Self::Average(args) => cmd_average(&args),
            Self::Vsum(args) => cmd_vsum(&args),
            Self::Rmse(args) => cmd_rmse(&args),
        }
    }
}

fn spectrum_format(selector: u32) -> Result<SpectrumFormat, String> {
    match selector {
        0 => Ok(SpectrumFormat::LogAmplitudeDb),
        1 => Ok(SpectrumFormat::LogAmplitude),
        2 => Ok(SpectrumFormat::Amplitude),
        3 => Ok(SpectrumFormat::Power),
        _ => Err(format!("unknown spectrum format selector {selector}")),
    }
}

fn metric(selector: u32) -> Result<Metric, String> {
    match selector {
        0 => Ok(Metric::Manhattan),
        1 => Ok(Metric::Euclidean),
        2 => Ok(Metric::SquaredEuclidean),
        3 => Ok(Metric::SymmetricKullbackLeibler),
        _ => Err(format!("unknown distance metric selector {selector}")),
    }
}

fn path_constraint(selector: u32) -> Result<LocalPathConstraint, String> {
    match selector {
        0 => Ok(LocalPathConstraint::Type0),
        1 => Ok(LocalPathConstraint::Type1),
        2 => Ok(LocalPathConstraint::Type2),
        3 => Ok(LocalPathConstraint::Type3),
        4 => Ok(LocalPathConstraint::Type4),
        5 => Ok(LocalPathConstraint::Type5),
        6 => Ok(LocalPathConstraint::Type6),
        _ => Err(format!("unknown local path constraint {selector}")),
    }
}

fn filter_bank_config(
    fft_length: usize,
    num_channel: usize,
    sampling_rate_khz: f64,
    lowest_frequency: f64,
    highest_frequency: f64,
    floor: f64,
) -> MelFilterBankConfig {
    let sampling_rate = sampling_rate_khz * 1000.0;
    MelFilterBankConfig {
        fft_length,
        num_channel,
        sampling_rate,
        lowest_frequency,
        highest_frequency: if highest_frequency <= 0.0 {
            0.5 * sampling_rate
        } else {
            highest_frequency
        },
        floor,
        ..Default::default()
    }
}

#[derive(clap::Args, Debug)]
struct AcorrArgs {
    /// Frame length.
    #[clap(short = 'l', long, default_value_t = 256)]
    frame_length: usize,
    /// Order of autocorrelation.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    infile: Option<String>,
}

fn cmd_acorr(args: &AcorrArgs) -> Result<(), String> {
    let acorr = WaveformToAutocorrelation::new(args.frame_length, args.num_order)
        .map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.frame_length,
    )?;
    let mut output = vec![];
    let mut autocorrelation = vec![];
    for frame in &frames {
        acorr
            .run(frame, &mut autocorrelation)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&autocorrelation);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct LevdurArgs {
    /// Order of LPC.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    infile: Option<String>,
}

fn cmd_levdur(args: &LevdurArgs) -> Result<(), String> {
    let levinson = LevinsonDurbin::new(args.num_order, 0.0).map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut output = vec![];
    let mut lpc = vec![];
    let mut buffer = LevinsonDurbinBuffer::default();
    for (t, frame) in frames.iter().enumerate() {
        let stable = levinson
            .run(frame, &mut lpc, &mut buffer)
            .map_err(|e| e.to_string())?;
        if !stable {
            log::warn!("unstable LPC at frame {t}");
        }
        output.extend_from_slice(&lpc);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct RlevdurArgs {
    /// Order of LPC.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    infile: Option<String>,
}

fn cmd_rlevdur(args: &RlevdurArgs) -> Result<(), String> {
    let reverse = ReverseLevinsonDurbin::new(args.num_order, 0.0).map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut output = vec![];
    let mut autocorrelation = vec![];
    let mut buffer = ReverseLevinsonDurbinBuffer::default();
    for frame in &frames {
        reverse
            .run(frame, &mut autocorrelation, &mut buffer)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&autocorrelation);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct Lpc2cArgs {
    /// Order of input LPC.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_input_order: usize,
    /// Order of output cepstrum.
    #[clap(short = 'M', long, default_value_t = 25)]
    num_output_order: usize,
    infile: Option<String>,
}

fn cmd_lpc2c(args: &Lpc2cArgs) -> Result<(), String> {
    let converter = LpcToCepstrum::new(args.num_input_order, args.num_output_order)
        .map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_input_order + 1,
    )?;
    let mut output = vec![];
    let mut cepstrum = vec![];
    for frame in &frames {
        converter
            .run(frame, &mut cepstrum)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&cepstrum);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct C2ndpsArgs {
    /// Order of cepstrum.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// FFT length.
    #[clap(short = 'l', long, default_value_t = 256)]
    fft_length: usize,
    infile: Option<String>,
}

fn cmd_c2ndps(args: &C2ndpsArgs) -> Result<(), String> {
    let converter =
        CepstrumToNdps::new(args.num_order, args.fft_length).map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut output = vec![];
    let mut ndps = vec![];
    let mut buffer = CepstrumToNdpsBuffer::default();
    for frame in &frames {
        converter
            .run(frame, &mut ndps, &mut buffer)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&ndps);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct Spec2specArgs {
    /// FFT length.
    #[clap(short = 'l', long, default_value_t = 256)]
    fft_length: usize,
    /// Input format: 0 (dB), 1 (log amplitude), 2 (amplitude), 3 (power).
    #[clap(short = 'q', long, default_value_t = 0)]
    input_format: u32,
    /// Output format: 0 (dB), 1 (log amplitude), 2 (amplitude), 3 (power).
    #[clap(short = 'o', long, default_value_t = 0)]
    output_format: u32,
    /// Small value added in the power domain.
    #[clap(short = 'e', long, default_value_t = 0.0)]
    epsilon: f64,
    /// Relative floor in decibels (negative); -inf disables flooring.
    #[clap(short = 'E', long, default_value_t = f64::NEG_INFINITY)]
    relative_floor: f64,
    infile: Option<String>,
}

fn cmd_spec2spec(args: &Spec2specArgs) -> Result<(), String> {
    let converter = SpectrumToSpectrum::new(
        args.fft_length,
        spectrum_format(args.input_format)?,
        spectrum_format(args.output_format)?,
        args.epsilon,
        args.relative_floor,
    )
    .map_err(|e| e.to_string())?;
    let mut frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.fft_length / 2 + 1,
    )?;
    let mut output = vec![];
    for frame in &mut frames {
        converter.run_in_place(frame).map_err(|e| e.to_string())?;
        output.extend_from_slice(frame);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct FbankArgs {
    /// FFT length.
    #[clap(short = 'l', long, default_value_t = 256)]
    fft_length: usize,
    /// Number of channels.
    #[clap(short = 'n', long, default_value_t = 20)]
    num_channel: usize,
    /// Sampling rate in kHz.
    #[clap(short = 's', long, default_value_t = 16.0)]
    sampling_rate: f64,
    /// Lowest frequency in Hz.
    #[clap(short = 'L', long, default_value_t = 0.0)]
    lowest_frequency: f64,
    /// Highest frequency in Hz; non-positive means the Nyquist frequency.
    #[clap(short = 'H', long, default_value_t = 0.0)]
    highest_frequency: f64,
    /// Floor applied before the logarithm.
    #[clap(short = 'e', long, default_value_t = 1.0)]
    floor: f64,
    /// Accumulate squared magnitudes instead of magnitudes.
    #[clap(short = 'P', long)]
    use_power: bool,
    infile: Option<String>,
}

fn cmd_fbank(args: &FbankArgs) -> Result<(), String> {
    let config = MelFilterBankConfig {
        use_power: args.use_power,
        ..filter_bank_config(
            args.fft_length,
            args.num_channel,
            args.sampling_rate,
            args.lowest_frequency,
            args.highest_frequency,
            args.floor,
        )
    };
    let filter_bank = MelFilterBank::new(&config).map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.fft_length / 2 + 1,
    )?;
    let mut output = vec![];
    let mut channels = vec![];
    for frame in &frames {
        filter_bank
            .run(frame, &mut channels, None)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&channels);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct MfccArgs {
    /// FFT length.
    #[clap(short = 'l', long, default_value_t = 256)]
    fft_length: usize,
    /// Number of channels.
    #[clap(short = 'n', long, default_value_t = 20)]
    num_channel: usize,
    /// Order of coefficients.
    #[clap(short = 'm', long, default_value_t = 12)]
    num_order: usize,
    /// Liftering coefficient.
    #[clap(short = 'c', long, default_value_t = 22)]
    liftering_coefficient: usize,
    /// Sampling rate in kHz.
    #[clap(short = 's', long, default_value_t = 16.0)]
    sampling_rate: f64,
    /// Lowest frequency in Hz.
    #[clap(short = 'L', long, default_value_t = 0.0)]
    lowest_frequency: f64,
    /// Highest frequency in Hz; non-positive means the Nyquist frequency.
    #[clap(short = 'H', long, default_value_t = 0.0)]
    highest_frequency: f64,
    /// Append the log energy to each output frame.
    #[clap(short = 'E', long)]
    energy: bool,
    infile: Option<String>,
}

fn cmd_mfcc(args: &MfccArgs) -> Result<(), String> {
    let config = filter_bank_config(
        args.fft_length,
        args.num_channel,
        args.sampling_rate,
        args.lowest_frequency,
        args.highest_frequency,
        1.0,
    );
    let mfcc = MfccAnalysis::new(&config, args.num_order, args.liftering_coefficient)
        .map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.fft_length / 2 + 1,
    )?;
    let mut output = vec![];
    let mut coefficients = vec![];
    let mut buffer = MfccAnalysisBuffer::default();
    for frame in &frames {
        let mut energy = 0.0;
        mfcc.run(
            frame,
            &mut coefficients,
            args.energy.then_some(&mut energy),
            &mut buffer,
        )
        .map_err(|e| e.to_string())?;
        output.extend_from_slice(&coefficients);
        if args.energy {
            output.push(energy);
        }
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct PlpArgs {
    /// FFT length.
    #[clap(short = 'l', long, default_value_t = 256)]
    fft_length: usize,
    /// Number of channels.
    #[clap(short = 'n', long, default_value_t = 20)]
    num_channel: usize,
    /// Order of coefficients.
    #[clap(short = 'm', long, default_value_t = 12)]
    num_order: usize,
    /// Liftering coefficient.
    #[clap(short = 'c', long, default_value_t = 22)]
    liftering_coefficient: usize,
    /// Amplitude compression factor.
    #[clap(short = 'a', long, default_value_t = 0.33)]
    compression_factor: f64,
    /// Sampling rate in kHz.
    #[clap(short = 's', long, default_value_t = 16.0)]
    sampling_rate: f64,
    /// Lowest frequency in Hz.
    #[clap(short = 'L', long, default_value_t = 0.0)]
    lowest_frequency: f64,
    /// Highest frequency in Hz; non-positive means the Nyquist frequency.
    #[clap(short = 'H', long, default_value_t = 0.0)]
    highest_frequency: f64,
    /// Append the log energy to each output frame.
    #[clap(short = 'E', long)]
    energy: bool,
    infile: Option<String>,
}

fn cmd_plp(args: &PlpArgs) -> Result<(), String> {
    let config = filter_bank_config(
        args.fft_length,
        args.num_channel,
        args.sampling_rate,
        args.lowest_frequency,
        args.highest_frequency,
        1.0,
    );
    let plp = PlpAnalysis::new(
        &config,
        args.num_order,
        args.liftering_coefficient,
        args.compression_factor,
    )
    .map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.fft_length / 2 + 1,
    )?;
    let mut output = vec![];
    let mut coefficients = vec![];
    let mut buffer = PlpAnalysisBuffer::default();
    for frame in &frames {
        let mut energy = 0.0;
        plp.run(
            frame,
            &mut coefficients,
            args.energy.then_some(&mut energy),
            &mut buffer,
        )
        .map_err(|e| e.to_string())?;
        output.extend_from_slice(&coefficients);
        if args.energy {
            output.push(energy);
        }
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct VqArgs {
    /// Order of vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Codebook file.
    codebook: String,
    infile: Option<String>,
}

fn cmd_vq(args: &VqArgs) -> Result<(), String> {
    let vq = VectorQuantization::new(args.num_order).map_err(|e| e.to_string())?;
    let codebook = stream::into_vectors(
        stream::read_doubles(Some(&args.codebook))?,
        args.num_order + 1,
    )?;
    let vectors = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut indices = vec![];
    for vector in &vectors {
        indices.push(vq.run(vector, &codebook).map_err(|e| e.to_string())?);
    }
    stream::write_indices(&indices)
}

#[derive(clap::Args, Debug)]
struct MsvqArgs {
    /// Order of vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Codebook file, one per stage in cascade order.
    #[clap(short = 's', long = "codebook", required = true)]
    codebooks: Vec<String>,
    infile: Option<String>,
}

fn cmd_msvq(args: &MsvqArgs) -> Result<(), String> {
    let msvq = MultistageVectorQuantization::new(args.num_order, args.codebooks.len())
        .map_err(|e| e.to_string())?;
    let mut codebooks = vec![];
    for path in &args.codebooks {
        codebooks.push(stream::into_vectors(
            stream::read_doubles(Some(path))?,
            args.num_order + 1,
        )?);
    }
    let vectors = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut output = vec![];
    let mut indices = vec![];
    let mut buffer = MultistageVectorQuantizationBuffer::default();
    for vector in &vectors {
        msvq.run(vector, &codebooks, &mut indices, &mut buffer)
            .map_err(|e| e.to_string())?;
        output.extend_from_slice(&indices);
    }
    stream::write_indices(&output)
}

#[derive(clap::Args, Debug)]
struct LbgArgs {
    /// Order of vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Target codebook size; must be a power of two.
    #[clap(short = 't', long, default_value_t = 256)]
    target_size: usize,
    /// Cap on k-means iterations per codebook size.
    #[clap(short = 'i', long, default_value_t = 1000)]
    num_iteration: usize,
    /// Relative distortion change below which iteration stops.
    #[clap(short = 'd', long, default_value_t = 1e-5)]
    convergence_threshold: f64,
    /// Seed of the splitting perturbation.
    #[clap(short = 's', long, default_value_t = 1)]
    seed: u64,
    infile: Option<String>,
}

fn cmd_lbg(args: &LbgArgs) -> Result<(), String> {
    let config = LbgConfig {
        initial_codebook_size: 1,
        target_codebook_size: args.target_size,
        num_iteration: args.num_iteration,
        convergence_threshold: args.convergence_threshold,
        seed: args.seed,
        ..Default::default()
    };
    let lbg = LindeBuzoGray::new(args.num_order, &config).map_err(|e| e.to_string())?;
    let vectors = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;

    // Seed the design with the global mean.
    let length = args.num_order + 1;
    let mut mean = vec![0.0; length];
    for vector in &vectors {
        for (m, &x) in mean.iter_mut().zip(vector) {
            *m += x;
        }
    }
    for m in &mut mean {
        *m /= vectors.len() as f64;
    }

    let mut codebook = vec![mean];
    let mut indices = vec![];
    lbg.run(&vectors, &mut codebook, &mut indices)
        .map_err(|e| e.to_string())?;
    stream::write_doubles(&codebook.concat())
}

#[derive(clap::Args, Debug)]
struct DtwArgs {
    /// Length of each vector.
    #[clap(short = 'l', long, default_value_t = 1)]
    vector_length: usize,
    /// Local path constraint: 0 to 6.
    #[clap(short = 'p', long, default_value_t = 1)]
    constraint: u32,
    /// Distance metric: 0 (Manhattan), 1 (Euclidean), 2 (squared
    /// Euclidean), 3 (symmetric KL).
    #[clap(short = 'd', long, default_value_t = 2)]
    metric: u32,
    /// Write only the normalized alignment score.
    #[clap(short = 'S', long)]
    score_only: bool,
    /// Reference sequence file.
    reference: String,
    infile: Option<String>,
}

fn cmd_dtw(args: &DtwArgs) -> Result<(), String> {
    if args.vector_length == 0 {
        return Err("vector length must be positive".to_owned());
    }
    let dtw = DynamicTimeWarping::new(
        args.vector_length - 1,
        path_constraint(args.constraint)?,
        metric(args.metric)?,
    )
    .map_err(|e| e.to_string())?;
    let reference = stream::into_vectors(
        stream::read_doubles(Some(&args.reference))?,
        args.vector_length,
    )?;
    let query = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.vector_length,
    )?;
    let mut path = vec![];
    let score = dtw
        .run(&query, &reference, &mut path)
        .map_err(|e| e.to_string())?;
    if args.score_only {
        return stream::write_doubles(&[score]);
    }
    let mut output = vec![];
    for &(i, j) in &path {
        output.extend_from_slice(&query[i]);
        output.extend_from_slice(&reference[j]);
    }
    stream::write_doubles(&output)
}

// Model layout per mixture: weight, mean, then either the covariance
// diagonal or the dense covariance rows.
fn write_gmm_model(parameters: &GmmParameters, diagonal: bool) -> Result<(), String> {
    let mut output = vec![];
    for ((&weight, mean), covariance) in parameters
        .weights
        .iter()
        .zip(&parameters.means)
        .zip(&parameters.covariances)
    {
        output.push(weight);
        output.extend_from_slice(mean);
        let length = covariance.num_dimension();
        if diagonal {
            for l in 0..length {
                output.push(covariance.at(l, l));
            }
        } else {
            for l in 0..length {
                for m in 0..length {
                    output.push(covariance.at(l, m));
                }
            }
        }
    }
    stream::write_doubles(&output)
}

fn read_gmm_model(
    data: &[f64],
    num_mixture: usize,
    length: usize,
    diagonal: bool,
) -> Result<GmmParameters, String> {
    let covariance_size = if diagonal { length } else { length * length };
    let record = 1 + length + covariance_size;
    if data.len() != num_mixture * record {
        return Err(format!(
            "model size {} does not match {num_mixture} mixtures of record size {record}",
            data.len()
        ));
    }
    let mut parameters = GmmParameters::default();
    for chunk in data.chunks_exact(record) {
        parameters.weights.push(chunk[0]);
        parameters.means.push(chunk[1..=length].to_vec());
        let mut covariance = SymmetricMatrix::new(length);
        let values = &chunk[1 + length..];
        if diagonal {
            for (l, &v) in values.iter().enumerate() {
                *covariance.at_mut(l, l) = v;
            }
        } else {
            for l in 0..length {
                for m in 0..=l {
                    *covariance.at_mut(l, m) = values[l * length + m];
                }
            }
        }
        parameters.covariances.push(covariance);
    }
    Ok(parameters)
}

#[derive(clap::Args, Debug)]
struct GmmArgs {
    /// Order of vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Number of mixture components.
    #[clap(short = 'k', long)]
    num_mixture: Option<usize>,
    /// Cap on EM iterations.
    #[clap(short = 'i', long)]
    num_iteration: Option<usize>,
    /// Log-likelihood change below which EM stops.
    #[clap(short = 'd', long)]
    convergence_threshold: Option<f64>,
    /// Train full covariances instead of diagonal ones.
    #[clap(short = 'f', long)]
    full: bool,
    /// MAP smoothing strength; requires a universal background model.
    #[clap(short = 'a', long)]
    smoothing_parameter: Option<f64>,
    /// Universal background model file.
    #[clap(short = 'U', long)]
    ubm: Option<String>,
    /// Load training parameters from a TOML file.
    #[clap(short = 'C', long)]
    config: Option<String>,
    infile: Option<String>,
}

fn cmd_gmm(args: &GmmArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
            toml::from_str::<GmmConfig>(&text).map_err(|e| format!("{path}: {e}"))?
        }
        None => GmmConfig {
            diagonal: true,
            ..Default::default()
        },
    };
    if let Some(num_mixture) = args.num_mixture {
        config.num_mixture = num_mixture;
    }
    if let Some(num_iteration) = args.num_iteration {
        config.num_iteration = num_iteration;
    }
    if let Some(threshold) = args.convergence_threshold {
        config.convergence_threshold = threshold;
    }
    if args.full {
        config.diagonal = false;
    }
    if let Some(alpha) = args.smoothing_parameter {
        config.smoothing_parameter = alpha;
    }

    let length = args.num_order + 1;
    let ubm = match &args.ubm {
        Some(path) => {
            if config.smoothing_parameter > 0.0 {
                config.initialization = GmmInitialization::Ubm;
            }
            Some(read_gmm_model(
                &stream::read_doubles(Some(path))?,
                config.num_mixture,
                length,
                config.diagonal,
            )?)
        }
        None => None,
    };

    let trainer =
        GaussianMixtureModeling::new(args.num_order, &config, ubm).map_err(|e| e.to_string())?;
    let vectors = stream::into_vectors(stream::read_doubles(args.infile.as_deref())?, length)?;
    let mut parameters = GmmParameters::default();
    trainer
        .run(&vectors, &mut parameters)
        .map_err(|e| e.to_string())?;
    write_gmm_model(&parameters, config.diagonal)
}

fn read_windows(paths: &[String]) -> Result<Vec<Vec<f64>>, String> {
    let mut windows = vec![];
    for path in paths {
        windows.push(stream::read_doubles(Some(path))?);
    }
    Ok(windows)
}

#[derive(clap::Args, Debug)]
struct MlpgArgs {
    /// Order of static vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Window coefficient file, one per dynamic stream.
    #[clap(short = 'd', long = "window")]
    windows: Vec<String>,
    /// Means whose first element equals this value mark skip frames.
    #[clap(long)]
    magic: Option<f64>,
    infile: Option<String>,
}

fn cmd_mlpg(args: &MlpgArgs) -> Result<(), String> {
    let windows = read_windows(&args.windows)?;
    let mlpg = MaximumLikelihoodParameterGeneration::new(args.num_order, &windows, args.magic)
        .map_err(|e| e.to_string())?;
    let length = mlpg.input_length();

    // Each frame carries its mean vector followed by its variance vector.
    let frames = stream::into_vectors(stream::read_doubles(args.infile.as_deref())?, 2 * length)?;
    let mut means = vec![];
    let mut variances = vec![];
    for frame in &frames {
        means.push(frame[..length].to_vec());
        variances.push(frame[length..].to_vec());
    }

    let mut smoothed = vec![];
    mlpg.run_with_variances(&means, &variances, &mut smoothed)
        .map_err(|e| e.to_string())?;
    stream::write_doubles(&smoothed.concat())
}

#[derive(clap::Args, Debug)]
struct VcArgs {
    /// Order of source static vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_source_order: usize,
    /// Order of target static vectors; defaults to the source order.
    #[clap(short = 'M', long)]
    num_target_order: Option<usize>,
    /// Number of mixture components of the joint model.
    #[clap(short = 'k', long, default_value_t = 16)]
    num_mixture: usize,
    /// Joint-density model file with full covariances.
    #[clap(short = 'g', long)]
    gmm: String,
    /// Window coefficient file, one per dynamic stream.
    #[clap(short = 'd', long = "window")]
    windows: Vec<String>,
    /// Source frames whose first element equals this value pass through.
    #[clap(long)]
    magic: Option<f64>,
    infile: Option<String>,
}

fn cmd_vc(args: &VcArgs) -> Result<(), String> {
    let windows = read_windows(&args.windows)?;
    let num_target_order = args.num_target_order.unwrap_or(args.num_source_order);
    let num_stream = windows.len() + 1;
    let source_length = (args.num_source_order + 1) * num_stream;
    let target_length = (num_target_order + 1) * num_stream;

    let parameters = read_gmm_model(
        &stream::read_doubles(Some(&args.gmm))?,
        args.num_mixture,
        source_length + target_length,
        false,
    )?;
    let vc = GmmBasedConversion::new(
        args.num_source_order,
        num_target_order,
        &windows,
        &parameters,
        args.magic,
    )
    .map_err(|e| e.to_string())?;

    let source = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        source_length,
    )?;
    let mut target = vec![];
    vc.run(&source, &mut target).map_err(|e| e.to_string())?;
    stream::write_doubles(&target.concat())
}

#[derive(clap::Args, Debug)]
struct PcaArgs {
    /// Order of vectors.
    #[clap(short = 'm', long, default_value_t = 25)]
    num_order: usize,
    /// Cap on Jacobi iterations.
    #[clap(short = 'i', long, default_value_t = 10000)]
    num_iteration: usize,
    /// Largest off-diagonal magnitude below which iteration stops.
    #[clap(short = 'd', long, default_value_t = 1e-6)]
    convergence_threshold: f64,
    /// Diagonalize the correlation matrix instead of the covariance.
    #[clap(short = 'c', long)]
    correlation: bool,
    infile: Option<String>,
}

fn cmd_pca(args: &PcaArgs) -> Result<(), String> {
    let pca = PrincipalComponentAnalysis::new(
        args.num_order,
        args.num_iteration,
        args.convergence_threshold,
        args.correlation,
    )
    .map_err(|e| e.to_string())?;
    let vectors = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_order + 1,
    )?;
    let mut mean = vec![];
    let mut eigenvalues = vec![];
    let mut eigenvectors = vec![];
    let mut buffer = PcaBuffer::default();
    pca.run(
        &vectors,
        &mut mean,
        &mut eigenvalues,
        &mut eigenvectors,
        &mut buffer,
    )
    .map_err(|e| e.to_string())?;

    // Mean, eigenvalues, then eigenvector rows.
    let mut output = mean;
    output.extend_from_slice(&eigenvalues);
    for row in &eigenvectors {
        output.extend_from_slice(row);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct HistogramArgs {
    /// Frame length; omit to use the whole stream.
    #[clap(short = 't', long)]
    frame_length: Option<usize>,
    /// Number of bins.
    #[clap(short = 'b', long, default_value_t = 10)]
    num_bin: usize,
    /// Lower bound.
    #[clap(short = 'l', long, default_value_t = 0.0)]
    lower_bound: f64,
    /// Upper bound.
    #[clap(short = 'u', long, default_value_t = 1.0)]
    upper_bound: f64,
    /// Divide counts by the frame length.
    #[clap(short = 'n', long)]
    normalize: bool,
    infile: Option<String>,
}

fn cmd_histogram(args: &HistogramArgs) -> Result<(), String> {
    let data = stream::read_doubles(args.infile.as_deref())?;
    let frame_length = args.frame_length.unwrap_or(data.len());
    let calculator =
        HistogramCalculator::new(frame_length, args.num_bin, args.lower_bound, args.upper_bound)
            .map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(data, frame_length)?;
    let mut output = vec![];
    let mut histogram = vec![];
    for frame in &frames {
        calculator
            .run(frame, &mut histogram)
            .map_err(|e| e.to_string())?;
        if args.normalize {
            for count in &mut histogram {
                *count /= frame_length as f64;
            }
        }
        output.extend_from_slice(&histogram);
    }
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct EntropyArgs {
    /// Number of elements per distribution.
    #[clap(short = 'l', long, default_value_t = 256)]
    num_element: usize,
    /// Unit: 0 (bit), 1 (nat), 2 (dit).
    #[clap(short = 'o', long, default_value_t = 0)]
    unit: u32,
    /// Output one entropy per frame instead of one for the averaged
    /// distribution.
    #[clap(short = 'f', long)]
    frame_by_frame: bool,
    infile: Option<String>,
}

fn cmd_entropy(args: &EntropyArgs) -> Result<(), String> {
    let unit = match args.unit {
        0 => EntropyUnit::Bit,
        1 => EntropyUnit::Nat,
        2 => EntropyUnit::Dit,
        other => return Err(format!("unknown entropy unit selector {other}")),
    };
    let calculator = EntropyCalculator::new(args.num_element, unit).map_err(|e| e.to_string())?;
    let frames = stream::into_vectors(
        stream::read_doubles(args.infile.as_deref())?,
        args.num_element,
    )?;
    if args.frame_by_frame {
        let mut output = vec![];
        for frame in &frames {
            output.push(calculator.run(frame).map_err(|e| e.to_string())?);
        }
        return stream::write_doubles(&output);
    }

    let mut averaged = vec![0.0; args.num_element];
    for frame in &frames {
        for (a, &p) in averaged.iter_mut().zip(frame) {
            *a += p;
        }
    }
    for a in &mut averaged {
        *a /= frames.len() as f64;
    }
    let entropy = calculator.run(&averaged).map_err(|e| e.to_string())?;
    stream::write_doubles(&[entropy])
}

#[derive(clap::Args, Debug)]
struct AverageArgs {
    /// Frame length; omit to average the whole stream.
    #[clap(short = 'l', long)]
    frame_length: Option<usize>,
    infile: Option<String>,
}

fn cmd_average(args: &AverageArgs) -> Result<(), String> {
    let data = stream::read_doubles(args.infile.as_deref())?;
    let output = match args.frame_length {
        Some(frame_length) => {
            frame_stats::framed_average(&data, frame_length).map_err(|e| e.to_string())?
        }
        None => vec![frame_stats::average(&data).map_err(|e| e.to_string())?],
    };
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct VsumArgs {
    /// Length of each vector.
    #[clap(short = 'l', long, default_value_t = 1)]
    vector_length: usize,
    /// Number of vectors per output; omit to sum the whole stream.
    #[clap(short = 't', long)]
    vectors_per_output: Option<usize>,
    infile: Option<String>,
}

fn cmd_vsum(args: &VsumArgs) -> Result<(), String> {
    let data = stream::read_doubles(args.infile.as_deref())?;
    let output = frame_stats::vector_summation(&data, args.vector_length, args.vectors_per_output)
        .map_err(|e| e.to_string())?;
    stream::write_doubles(&output)
}

#[derive(clap::Args, Debug)]
struct RmseArgs {
    /// Frame length; omit for a single overall value.
    #[clap(short = 'l', long)]
    frame_length: Option<usize>,
    /// Second input file.
    file: String,
    infile: Option<String>,
}

fn cmd_rmse(args: &RmseArgs) -> Result<(), String> {
    let x = stream::read_doubles(args.infile.as_deref())?;
    let y = stream::read_doubles(Some(&args.file))?;
    let output = match args.frame_length {
        Some(frame_length) => frame_stats::framed_root_mean_squared_error(&x, &y, frame_length)
            .map_err(|e| e.to_string())?,
        None => vec![frame_stats::root_mean_squared_error(&x, &y).map_err(|e| e.to_string())?],
    };
    stream::write_doubles(&output)
}

fn log_build_constants() {
    log::info!(
        "spkit library version \"{}\"",
        spkit::constant::build_info::CRATE_VERSION
    );
}

fn main() -> ExitCode {
    env_logger::Builder::from_env("SPKIT_LOG")
        .format_timestamp(None)
        .init();
    log_build_constants();
    let args = Args::parse();
    let name = args.command.name();
    match args.command.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("spkit {name}: {message}");
            ExitCode::FAILURE
        }
    }
}
